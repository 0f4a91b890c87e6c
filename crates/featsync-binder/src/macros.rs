//! `feature_settings!` declaration macro

/// Declare an observable feature settings type
///
/// ```rust,ignore
/// feature_settings! {
///     /// Audio options
///     pub struct AudioSettings {
///         /// Master volume, 0-100
///         volume: u8 = 80,
///         device: Option<String> = None,
///     }
/// }
/// ```
///
/// Expands to:
/// - `AudioSettings`: the shared instance type, with `volume()` /
///   `set_volume(..)` accessors for every field and a [`FeatureSettings`]
///   impl
/// - `AudioSettingsValues`: a plain record of the field values
///
/// Field types must be `Clone + Debug + Serialize + DeserializeOwned`.
/// Stored keys are the PascalCase field names (`volume` → `Volume`).
///
/// [`FeatureSettings`]: crate::FeatureSettings
#[macro_export]
macro_rules! feature_settings {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty = $default:expr
            ),* $(,)?
        }
    ) => {
        $crate::__private::paste! {
            $(#[$meta])*
            $vis struct $name {
                values: $crate::__private::RwLock<[<$name Values>]>,
                hook: $crate::WriteHook,
            }

            #[doc = concat!("Field values of [`", stringify!($name), "`]")]
            #[derive(Debug, Clone)]
            $vis struct [<$name Values>] {
                $(
                    $(#[$field_meta])*
                    pub $field: $ty,
                )*
            }

            impl ::core::default::Default for [<$name Values>] {
                fn default() -> Self {
                    Self {
                        $( $field: $default, )*
                    }
                }
            }

            #[allow(dead_code)]
            impl $name {
                /// Instance holding default values
                #[must_use]
                pub fn new() -> Self {
                    Self::from_values(::core::default::Default::default())
                }

                /// Instance holding `values`
                #[must_use]
                pub fn from_values(values: [<$name Values>]) -> Self {
                    Self {
                        values: $crate::__private::RwLock::new(values),
                        hook: $crate::WriteHook::new(),
                    }
                }

                /// Copy of every field value
                #[must_use]
                pub fn values(&self) -> [<$name Values>] {
                    self.values.read().clone()
                }

                $(
                    $(#[$field_meta])*
                    #[must_use]
                    pub fn $field(&self) -> $ty {
                        self.values.read().$field.clone()
                    }

                    #[doc = concat!("Set `", stringify!($field), "` and report the write")]
                    pub fn [<set_ $field>](&self, value: $ty) {
                        self.values.write().$field = value;
                        self.hook.notify(stringify!($field));
                    }
                )*

                fn parse_values(
                    value: &$crate::__private::Value,
                ) -> ::core::result::Result<[<$name Values>], $crate::HydrateError> {
                    let map = value.as_object().ok_or($crate::HydrateError::NotAnObject {
                        type_name: stringify!($name),
                    })?;
                    #[allow(unused_mut)]
                    let mut values = [<$name Values>]::default();
                    $(
                        if let Some(raw) = map.get(stringify!([<$field:camel>])) {
                            if let Some(decoded) = $crate::__private::decode_field::<$ty>(
                                stringify!($name),
                                stringify!([<$field:camel>]),
                                raw,
                            ) {
                                values.$field = decoded;
                            }
                        }
                    )*
                    Ok(values)
                }
            }

            impl ::core::default::Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl ::core::fmt::Debug for $name {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    f.debug_struct(stringify!($name))
                        .field("values", &*self.values.read())
                        .field("hook", &self.hook)
                        .finish()
                }
            }

            impl $crate::FeatureSettings for $name {
                const TYPE_NAME: &'static str = stringify!($name);
                const FIELDS: &'static [&'static str] = &[$( stringify!($field) ),*];

                fn defaults() -> Self {
                    Self::new()
                }

                fn from_value(
                    value: &$crate::__private::Value,
                ) -> ::core::result::Result<Self, $crate::HydrateError> {
                    Self::parse_values(value).map(Self::from_values)
                }

                fn hydrate(
                    &self,
                    value: &$crate::__private::Value,
                ) -> ::core::result::Result<(), $crate::HydrateError> {
                    let values = Self::parse_values(value)?;
                    *self.values.write() = values;
                    Ok(())
                }

                fn to_value(&self) -> $crate::__private::Value {
                    #[allow(unused_variables)]
                    let values = self.values.read();
                    #[allow(unused_mut)]
                    let mut map = $crate::__private::Map::new();
                    $(
                        map.insert(
                            stringify!([<$field:camel>]).to_string(),
                            $crate::__private::encode_field(
                                stringify!($name),
                                stringify!($field),
                                &values.$field,
                            ),
                        );
                    )*
                    $crate::__private::Value::Object(map)
                }

                fn field_value(&self, field: &str) -> ::core::option::Option<$crate::__private::Value> {
                    #[allow(unused_variables)]
                    let values = self.values.read();
                    $(
                        if field == stringify!($field) {
                            return Some($crate::__private::encode_field(
                                stringify!($name),
                                field,
                                &values.$field,
                            ));
                        }
                    )*
                    None
                }

                fn write_hook(&self) -> &$crate::WriteHook {
                    &self.hook
                }
            }
        }
    };
}
