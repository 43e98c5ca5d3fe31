//! `rsview` is a lightweight desktop image viewer for Wayland.
//!
//! The viewer core (image collection, menu and viewer controllers) is
//! independent of the windowing system; `wayland` drives it with a real
//! xdg-shell window and presents frames through shared memory or wgpu.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod collection;
pub mod error;
pub mod geometry;
pub mod image_loader;
pub mod input;
pub mod menu;
pub mod picker;
pub mod text;
pub mod wayland;
mod wgpu_renderer;
