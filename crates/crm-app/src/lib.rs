// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod codec;
pub mod convert;
pub mod forms;
pub mod ids;
pub mod model;
pub mod schema;

pub use codec::*;
pub use convert::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use schema::*;
