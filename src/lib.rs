//! reqsync - requirements export library for uv-managed Python projects
//!
//! This library provides the core functionality for keeping pip-compatible
//! requirement lists in sync with a uv lockfile:
//! - Production list (`requirements.txt`) without self-references
//! - Development list (`requirements-dev.txt`) disjoint from production
//! - Dependency tree snapshot (`dependency-tree.txt`)
//! - Installability validation and drift detection

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod output;
pub mod progress;
pub mod resolver;
pub mod sync;
