//! Typed parameters for endpoint inputs, validated by deserialization before
//! they reach the domain layer.

pub(crate) mod notification;
