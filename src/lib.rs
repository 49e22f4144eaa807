//! Discovery of published cloud disk images and resolution of the artifact
//! descriptors containerdisks are built from.

pub mod cloud;
pub mod hashsum;
pub mod helpers;
pub mod repositories;

#[cfg(test)]
pub(crate) mod testutil;
