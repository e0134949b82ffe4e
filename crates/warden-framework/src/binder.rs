//! Parameter binding from keyword captures.
//!
//! Each listener declares its parameters up front as [`ParamDescriptor`]s.
//! On every invocation the binder looks up each parameter's capture name in
//! the listener's keywords (in filter-declaration order, first match wins),
//! converts the captured text, and hands the handler a [`BoundArgs`] map.
//!
//! | Captured | Default declared | Required | Bound value            |
//! |----------|------------------|----------|------------------------|
//! | yes      | any              | any      | converted capture      |
//! | no       | yes              | any      | the default            |
//! | no       | no               | no       | null                   |
//! | no       | no               | yes      | `BindError::Missing`   |
//!
//! ```rust,ignore
//! Listener::builder("ban")
//!     .filter(Filter::builder().value("ban {{target}} {{days,\\d+}}").build()?)
//!     .param(ParamDescriptor::string("target"))
//!     .param(ParamDescriptor::parsed::<u32>("days").default_value(1_u32))
//!     .handler(|args: BoundArgs| async move {
//!         let days: u32 = args.get("days").unwrap_or(1);
//!         format!("banned {} for {days} days", args.get_str("target").unwrap_or_default())
//!     });
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use warden_core::{BindError, BindResult};

use crate::error::BoxError;
use crate::keyword::Keyword;

/// A type-erased bound argument.
#[derive(Clone)]
pub struct ArgValue(Arc<dyn Any + Send + Sync>);

impl ArgValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArgValue(..)")
    }
}

/// The value bound when a parameter is not captured.
#[derive(Debug, Clone)]
pub enum ParamDefault {
    /// An explicit null default.
    Null,
    Value(ArgValue),
}

/// Converts captured text into a typed argument.
pub type Converter = Arc<dyn Fn(&str) -> Result<ArgValue, BoxError> + Send + Sync>;

/// Describes one handler parameter, captured at registration time.
#[derive(Clone)]
pub struct ParamDescriptor {
    name: String,
    capture: String,
    required: bool,
    default: Option<ParamDefault>,
    converter: Converter,
}

impl ParamDescriptor {
    /// A required `String` parameter captured under its own name.
    pub fn string(name: impl Into<String>) -> Self {
        Self::with_converter(name, |raw| Ok(ArgValue::new(raw.to_string())))
    }

    /// A required parameter parsed with [`FromStr`].
    pub fn parsed<T>(name: impl Into<String>) -> Self
    where
        T: FromStr + Any + Send + Sync,
        T::Err: fmt::Display,
    {
        Self::with_converter(name, |raw| {
            raw.trim()
                .parse::<T>()
                .map(ArgValue::new)
                .map_err(|err| err.to_string().into())
        })
    }

    /// A required parameter with a custom converter.
    pub fn with_converter<F>(name: impl Into<String>, converter: F) -> Self
    where
        F: Fn(&str) -> Result<ArgValue, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            capture: name.clone(),
            name,
            required: true,
            default: None,
            converter: Arc::new(converter),
        }
    }

    /// Binds from a capture group with a different name.
    pub fn capture(mut self, capture: impl Into<String>) -> Self {
        self.capture = capture.into();
        self
    }

    /// Marks the parameter as not required; it binds null when uncaptured.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn default_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(ParamDefault::Value(ArgValue::new(value)));
        self
    }

    /// Declares an explicit null default.
    pub fn default_null(mut self) -> Self {
        self.default = Some(ParamDefault::Null);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capture_name(&self) -> &str {
        &self.capture
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    fn resolve(&self, keywords: &[Keyword], text: Option<&str>) -> BindResult<Option<ArgValue>> {
        let captured = text.and_then(|text| {
            keywords
                .iter()
                .find_map(|keyword| keyword.get_param(text, &self.capture))
        });

        if let Some(raw) = captured {
            return (self.converter)(&raw)
                .map(Some)
                .map_err(|err| BindError::Conversion {
                    name: self.name.clone(),
                    raw,
                    reason: err.to_string(),
                });
        }

        match &self.default {
            Some(ParamDefault::Value(value)) => Ok(Some(value.clone())),
            Some(ParamDefault::Null) => Ok(None),
            None if !self.required => Ok(None),
            None => Err(BindError::missing(&self.name)),
        }
    }
}

impl fmt::Debug for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDescriptor")
            .field("name", &self.name)
            .field("capture", &self.capture)
            .field("required", &self.required)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Binds every parameter against `text`.
///
/// Stops at the first parameter that cannot be bound.
pub fn bind(
    params: &[ParamDescriptor],
    keywords: &[Keyword],
    text: Option<&str>,
) -> BindResult<BoundArgs> {
    let mut values = HashMap::with_capacity(params.len());
    for param in params {
        values.insert(param.name.clone(), param.resolve(keywords, text)?);
    }
    Ok(BoundArgs {
        values: Arc::new(values),
    })
}

/// Arguments bound for one listener invocation.
///
/// A parameter present with a null value was declared but not captured.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: Arc<HashMap<String, Option<ArgValue>>>,
}

impl BoundArgs {
    /// Returns a clone of the argument if it is bound to a `T`.
    pub fn get<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.get_ref(name).cloned()
    }

    pub fn get_ref<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.as_ref()?.downcast_ref()
    }

    /// Returns a `String` argument.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get_ref::<String>(name).map(String::as_str)
    }

    /// Returns `true` if `name` is declared and bound to null.
    pub fn is_null(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(None))
    }

    /// Returns `true` if `name` is a declared parameter.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
