// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod forms;
pub mod ids;
pub mod model;
pub mod timestamp;

pub use forms::*;
pub use ids::*;
pub use model::*;
