// Copyright (c) 2017-2020 Fabian Schuiki

//! Facilities to emit a module as human-readable assembly, or to parse such
//! assembly back into a module.

mod reader;
mod writer;

pub use self::reader::parse_module;
pub use self::writer::{write_module, write_module_string};
