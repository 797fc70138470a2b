//! appident maps processes and compositor windows to installed
//! applications.
//!
//! Two halves:
//! - [`resolver`]: resolves a process to the unique catalog application
//!   whose launch command runs the process's executable.
//! - [`registry`]: the live, multi-indexed set of tracked windows fed by
//!   a compositor event source.
//!
//! [`dock`] owns a registry and tags windows with their application;
//! [`x11`] provides concrete window-source collaborators for an X11
//! session; [`service`] maps resolver failures onto RPC-style replies.

pub mod catalog;
pub mod dock;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod x11;
