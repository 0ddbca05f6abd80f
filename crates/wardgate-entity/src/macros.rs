/// Define a string-backed enum stored as a Postgres enum type.
///
/// Generates `as_str`, `ALL`, `Display`, and a `FromStr` that reports
/// unknown values as validation errors. Variant texts must be the
/// snake_case form of the variant names, which is what serde and sqlx
/// use on the wire.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $type_name:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize, sqlx::Type,
        )]
        #[sqlx(type_name = $type_name, rename_all = "snake_case")]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant
            ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the wire name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = wardgate_core::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase().replace('-', "_");
                $(
                    if normalized == $text {
                        return Ok(Self::$variant);
                    }
                )+
                Err(wardgate_core::AppError::validation(format!(
                    "Invalid {}: '{}'. Expected one of: {}",
                    $type_name,
                    s,
                    [$($text),+].join(", ")
                )))
            }
        }
    };
}
