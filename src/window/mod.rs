//! Window management module for the StealthPad application
//!
//! This module contains all window-related functionality, split into
//! logical submodules: the Window Set registry, window creation and
//! per-window operations, and the window procedures.

pub mod manager;
pub mod proc;
pub mod state;
