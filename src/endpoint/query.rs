//! Query abstraction over the parameter containers of different web frameworks.

use std::borrow::Cow;
use std::collections::HashMap;

/// Allows access to the query parameters in a url or a body of `x-www-form-urlencoded` type.
///
/// Internally, parameters may be stored in multiple different ways depending on the framework
/// that parsed them. The consumers in this crate only require two views: a lookup of a key that
/// must not be ambiguous, and a normalized listing of all pairs in request order.
pub trait QueryParameter {
    /// Get the **unique** value associated with the given key.
    ///
    /// If there are multiple values associated with the key, return `None`. A parameter repeated
    /// in a request is treated the same as an absent one, as mandated for protocol parameters.
    fn unique_value(&self, key: &str) -> Option<Cow<'_, str>>;

    /// All key-value pairs in request order, one entry per occurrence.
    fn normalize(&self) -> Vec<(String, String)>;
}

impl QueryParameter for HashMap<String, String> {
    fn unique_value(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(|value| Cow::Borrowed(value.as_str()))
    }

    fn normalize(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl QueryParameter for HashMap<String, Vec<String>> {
    fn unique_value(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.get(key).map(Vec::as_slice) {
            Some([value]) => Some(Cow::Borrowed(value.as_str())),
            _ => None,
        }
    }

    fn normalize(&self) -> Vec<(String, String)> {
        self.iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.clone(), value.clone())))
            .collect()
    }
}

impl QueryParameter for Vec<(String, String)> {
    fn unique_value(&self, key: &str) -> Option<Cow<'_, str>> {
        let mut found = None;
        for (candidate, value) in self {
            if candidate == key {
                if found.is_some() {
                    return None;
                }
                found = Some(Cow::Borrowed(value.as_str()));
            }
        }
        found
    }

    fn normalize(&self) -> Vec<(String, String)> {
        self.clone()
    }
}

impl<'a, Q: QueryParameter + ?Sized> QueryParameter for &'a Q {
    fn unique_value(&self, key: &str) -> Option<Cow<'_, str>> {
        (**self).unique_value(key)
    }

    fn normalize(&self) -> Vec<(String, String)> {
        (**self).normalize()
    }
}

impl<'a, Q: QueryParameter + ?Sized> QueryParameter for &'a mut Q {
    fn unique_value(&self, key: &str) -> Option<Cow<'_, str>> {
        (**self).unique_value(key)
    }

    fn normalize(&self) -> Vec<(String, String)> {
        (**self).normalize()
    }
}
