//! Pure rules for fabworks.
//!
//! This crate contains the data definitions and rules that are independent
//! of any ECS world, timer, or runtime. Everything here is plain serde data
//! plus pure functions, making it unit-testable and portable.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`access`] | Store access modes (public / view-only / private) and allow rules |
//! | [`catalog`] | Resource ids and static definitions (weight, volume, stacking) |
//! | [`recipe`] | Production recipes: named inputs, outputs, duration, power need |

pub mod access;
pub mod catalog;
pub mod recipe;
