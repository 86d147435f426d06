// SPDX-License-Identifier: MIT

pub mod definition;
pub mod sources;
