#![doc = "book-publish-core: core pipeline for book-publish."]

//! This crate holds the whole publish pipeline: validating a project's book
//! configuration, writing the `docs.json` manifest, packing every compiled book
//! into one zip archive and uploading it to the doc cloud.
//!
//! # Usage
//! Hosts build a [`config::PublishConfig`], pick a scratch directory and a
//! [`progress::ProgressSink`], then call [`publish::publish`] directly or go through
//! the [`plugin::HostPlugin`] surface.

pub mod archive;
pub mod config;
pub mod error;
pub mod manifest;
pub mod plugin;
pub mod progress;
pub mod publish;
pub mod uploader;
pub mod validate;
