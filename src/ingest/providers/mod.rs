// src/ingest/providers/mod.rs
pub mod discovery;
pub mod feed;
pub mod manual;
pub mod proxy;
pub mod sheet;
pub mod timeline;
