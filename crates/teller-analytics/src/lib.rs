// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod insight;
pub mod viz;

pub use insight::*;
pub use viz::*;
