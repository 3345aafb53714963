//! Clients for the external collaborators: the identity provider and the
//! image-upload signing helper.

pub mod identity;
pub mod upload_auth;
