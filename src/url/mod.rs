//! URL handling module for Company-Crawler
//!
//! This module provides page/document classification, URL normalization, host
//! helpers and tag derivation.

mod classifier;
mod domain;
mod normalize;
mod tags;

pub use classifier::{
    classify, has_document_extension, is_definitely_document_url, is_document_url, UrlClass,
    DOCUMENT_EXTENSIONS, WEB_PAGE_EXTENSIONS,
};
pub use domain::{extract_domain, extract_subdomain, is_same_host};
pub use normalize::{normalize_document_url, normalize_url, resolve_link};
pub use tags::{derive_tags, document_tags, extract_path_tags, push_tag};
