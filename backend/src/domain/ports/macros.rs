//! `define_port_error!` declares an adapter error enum.
//!
//! Every variant carries one `String` field named in the declaration and
//! gets a snake_case constructor taking `impl Into<String>`:
//!
//! ```text
//! define_port_error! {
//!     pub enum StoreError {
//!         Offline { message } => "store offline: {message}",
//!     }
//! }
//! StoreError::offline("timeout");
//! ```

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $field:ident } => $message:literal,
            )+
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $field: String },
            )+
        }

        impl $name {
            $(
                ::paste::paste! {
                    pub fn [<$variant:snake>]($field: impl Into<String>) -> Self {
                        Self::$variant { $field: $field.into() }
                    }
                }
            )+
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum StoreError {
            Offline { message } => "store offline: {message}",
            DuplicateCode { new_code } => "code {new_code} is taken",
        }
    }

    #[test]
    fn constructors_are_snake_case_and_accept_str() {
        assert_eq!(
            StoreError::duplicate_code("J005"),
            StoreError::DuplicateCode {
                new_code: "J005".to_owned()
            }
        );
    }

    #[test]
    fn messages_interpolate_the_field() {
        assert_eq!(StoreError::offline("timeout").to_string(), "store offline: timeout");
        assert_eq!(StoreError::duplicate_code(String::from("J005")).to_string(), "code J005 is taken");
    }
}
