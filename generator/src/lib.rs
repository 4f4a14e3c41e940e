// uidgen — Unique-ID interceptor generator
//
// Library root. Passes run in order collect → emit; see `pipeline`.

pub mod collect;
pub mod descriptor;
pub mod diag;
pub mod emit;
pub mod format;
pub mod location;
pub mod pass;
pub mod pipeline;
pub mod site;
