// TODO: make this more DRY -- the node names are repeated in the
// `ast_struct!`/`ast_id_struct!` invocations and the `ast_enum!` expansion.

/// Given an enum name, a struct name and a list of `ident, type` pairs, make:
/// - A struct for the given node type.
/// - An impl with `new` and `make`. `new` takes the `ident: type` pairs as
///   parameters and returns the raw struct; the `make` convenience method
///   takes the same parameters and returns the node wrapped in its enum
///   variant behind a `Gc`.
#[macro_export]
macro_rules! ast_struct {
    ($enum_name: ident, $struct_name: ident, $($field: ident, $type: ty),*) => {
        #[derive(Debug, ::gc::Finalize, ::gc::Trace)]
        pub struct $struct_name {
            $(
                pub $field: $type,
            )*
        }

        impl $struct_name {
            pub fn new($($field: $type,)*) -> Self {
                Self { $($field,)* }
            }

            #[allow(unused)]
            pub fn make($($field: $type,)*) -> $enum_name {
                $enum_name::$struct_name(::gc::Gc::new($struct_name::new($($field,)*)))
            }
        }
    };
}

/// Like `ast_struct!`, but the node also carries a unique `usize` id
/// assigned at construction. Nodes the resolver records depths for need
/// identity, not structural equality: two textually identical variable
/// uses in different scopes must key different side-table entries.
#[macro_export]
macro_rules! ast_id_struct {
    ($enum_name: ident, $struct_name: ident, $($field: ident, $type: ty),*) => {
        #[derive(Debug, ::gc::Finalize, ::gc::Trace)]
        pub struct $struct_name {
            $(
                pub $field: $type,
            )*
            id: usize,
        }

        impl $struct_name {
            pub fn new($($field: $type,)*) -> Self {
                Self {
                    $($field,)*
                    id: $crate::unique_id::unique_id(),
                }
            }

            pub fn id(&self) -> usize {
                self.id
            }

            #[allow(unused)]
            pub fn make($($field: $type,)*) -> $enum_name {
                $enum_name::$struct_name(::gc::Gc::new($struct_name::new($($field,)*)))
            }
        }
    };
}

#[macro_export]
macro_rules! ast_enum {
    ($enum_name: ident, $($item: ident),*) => {
        #[derive(Clone, Debug, ::gc::Finalize, ::gc::Trace)]
        pub enum $enum_name {
            $(
                $item(::gc::Gc<$item>),
            )*
        }
    };
}
