//! Backend storage services for Tubely
//!
//! This crate provides the metadata persistence used by the upload backend.

pub mod video;
