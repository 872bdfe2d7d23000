// Promstash - Shared-store metrics engine
// Copyright (C) 2026 Promstash Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Library half of the `promstash` binary: command implementations, store
//! construction and output helpers.

pub mod commands;
pub mod output;
pub mod store;

pub use store::{open_store, Session};
