//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod health;
pub mod labels;
pub mod ner;
