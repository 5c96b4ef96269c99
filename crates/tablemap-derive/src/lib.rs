use proc_macro::TokenStream;

mod attr;
mod entity;

/// Derive `tablemap::traits::Entity` plus a typed `<Type>Columns` handle set.
///
/// Struct attributes: `#[entity(table = "...", database = "...",
/// prefix_database_name, backend = "...", assign_keys = "path")]`.
///
/// Field attributes: `#[field(primary_key, identity, computed, ignore,
/// required, max_length = N)]` for scalars, `#[field(one_to_many)]` or
/// `#[field(one_to_one)]` with optional `parent_column`/`child_column` for
/// associations, and `#[field(skip)]` for unmapped fields.
#[proc_macro_derive(Entity, attributes(entity, field))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}
