//! ghstat-github: GitHub backend for ghstat
//!
//! This crate provides a [`GitHubClient`] that implements the
//! [`ContentProvider`](ghstat_core::ContentProvider) trait on top of the
//! GitHub REST contents API.

pub mod client;

pub use client::GitHubClient;
