//! Handler results.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use crate::error::BoxError;

/// Result of a canonical handler invocation.
pub type HandlerResult = Result<Reply, BoxError>;

/// What a handler produced.
pub enum Reply {
    /// Nothing to write; distinct from an empty string.
    NoBody,
    /// UTF-8 text body.
    Text(String),
    /// Any other value. The response writer refuses to guess an encoding.
    Opaque(OpaqueValue),
}

impl Reply {
    /// Wrap an arbitrary value, keeping its type name for diagnostics.
    pub fn opaque<T: Any + Send>(value: T) -> Self {
        Reply::Opaque(OpaqueValue {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        })
    }

    pub fn is_no_body(&self) -> bool {
        matches!(self, Reply::NoBody)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::NoBody => f.write_str("NoBody"),
            Reply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Reply::Opaque(value) => f.debug_tuple("Opaque").field(&value.type_name).finish(),
        }
    }
}

/// A handler result of a type without a known encoding.
pub struct OpaqueValue {
    type_name: &'static str,
    value: Box<dyn Any + Send>,
}

impl OpaqueValue {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

/// Conversion from a value-returning handler's output.
pub trait IntoReply {
    fn into_reply(self) -> HandlerResult;
}

impl IntoReply for Reply {
    fn into_reply(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> HandlerResult {
        Ok(Reply::Text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> HandlerResult {
        Ok(Reply::Text(self.to_owned()))
    }
}

impl IntoReply for Cow<'static, str> {
    fn into_reply(self) -> HandlerResult {
        Ok(Reply::Text(self.into_owned()))
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> HandlerResult {
        self.map_err(Into::into)?.into_reply()
    }
}

/// Conversion from a no-result handler's output.
pub trait Completion {
    fn into_completion(self) -> Result<(), BoxError>;
}

impl Completion for () {
    fn into_completion(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> Completion for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_completion(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_conversions() {
        assert!(matches!("hi".into_reply(), Ok(Reply::Text(ref s)) if s == "hi"));
        assert!(matches!(String::from("x").into_reply(), Ok(Reply::Text(ref s)) if s == "x"));
        assert!(matches!(Cow::Borrowed("c").into_reply(), Ok(Reply::Text(ref s)) if s == "c"));
    }

    #[test]
    fn empty_text_is_not_no_body() {
        let reply = "".into_reply().unwrap();
        assert!(!reply.is_no_body());
        assert!(Reply::NoBody.is_no_body());
    }

    #[test]
    fn errors_pass_through() {
        let failed: Result<String, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        let err = failed.into_reply().unwrap_err();
        assert_eq!(err.to_string(), "disk");

        let done: Result<(), String> = Err("nope".into());
        assert_eq!(done.into_completion().unwrap_err().to_string(), "nope");
    }

    #[test]
    fn opaque_keeps_type_name() {
        let reply = Reply::opaque(42_i32);
        match reply {
            Reply::Opaque(value) => {
                assert_eq!(value.type_name(), "i32");
                assert_eq!(value.downcast_ref::<i32>(), Some(&42));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
