use crate::attr::{EntityAttrs, FieldAttrs, FieldRole};
use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Error, Fields, GenericArgument, PathArguments, Type, ext::IdentExt,
};

// derive_entity
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    expand(&input).unwrap_or_else(|err| err.to_compile_error())
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let vis = &input.vis;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                ident,
                "Entity can only be derived for structs with named fields",
            ));
        }
    };

    let attrs = EntityAttrs::parse(&input.attrs)?;
    let table = attrs
        .table
        .as_ref()
        .map_or_else(|| ident.to_string(), syn::LitStr::value);

    let mut steps = Vec::new();
    let mut rules = Vec::new();
    let mut accessors = Vec::new();

    if let Some(database) = &attrs.database {
        let prefix = attrs.prefix_database_name;
        steps.push(quote!(.database(#database, #prefix)));
    }
    if let Some(backend) = &attrs.backend {
        steps.push(quote!(.backend(#backend)));
    }

    for field in fields {
        let field_attrs = FieldAttrs::parse(&field.attrs)?;
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let name = field_ident.unraw().to_string();
        let ty = &field.ty;

        match field_attrs.role {
            FieldRole::Skip => {}

            FieldRole::Scalar => {
                let options = field_options(&field_attrs);
                steps.push(quote! {
                    .scalar(#name, #options, |e| &e.#field_ident, |e| &mut e.#field_ident)
                });
                accessors.push(quote! {
                    #[must_use]
                    pub fn #field_ident(&self) -> ::tablemap::query::Column<#ident, #ty> {
                        ::tablemap::query::Column::new(#name)
                    }
                });

                if field_attrs.required {
                    rules.push(quote! {
                        .rule(::tablemap::model::ValidationRule::required(#name))
                    });
                }
                if let Some(max) = &field_attrs.max_length {
                    rules.push(quote! {
                        .rule(::tablemap::model::ValidationRule::max_length(#name, #max))
                    });
                }
            }

            FieldRole::OneToMany | FieldRole::OneToOne => {
                let (wrapper, method) = if field_attrs.role == FieldRole::OneToMany {
                    ("Vec", quote!(one_to_many))
                } else {
                    ("Option", quote!(one_to_one))
                };
                let child = inner_type(ty, wrapper).ok_or_else(|| {
                    Error::new_spanned(
                        ty,
                        format!("{method} fields must be declared as {wrapper}<T>"),
                    )
                })?;
                let keys = join_keys(&field_attrs, &ident.to_string());

                steps.push(quote! {
                    .#method(#name, #keys, |e| &mut e.#field_ident)
                });
                accessors.push(quote! {
                    #[must_use]
                    pub fn #field_ident(&self) -> ::tablemap::query::Association<#ident, #child> {
                        ::tablemap::query::Association::new(#name)
                    }
                });
            }
        }
    }

    let assign_keys = attrs.assign_keys.as_ref().map(|path| {
        quote! {
            fn assign_keys(&mut self) {
                #path(self);
            }
        }
    });

    let columns_ident = format_ident!("{}Columns", ident);
    let columns_doc = format!("Typed column handles for [`{ident}`].");

    Ok(quote! {
        impl ::tablemap::traits::Entity for #ident {
            fn describe() -> ::tablemap::model::TableDefinition {
                ::tablemap::model::TableDefinition::builder::<Self>(#table)
                    #(#steps)*
                    #(#rules)*
                    .build()
            }

            #assign_keys
        }

        #[doc = #columns_doc]
        #[derive(Clone, Copy, Debug, Default)]
        #vis struct #columns_ident;

        impl #columns_ident {
            #(#accessors)*
        }

        impl #ident {
            #[must_use]
            #vis const fn columns() -> #columns_ident {
                #columns_ident
            }
        }
    })
}

fn field_options(attrs: &FieldAttrs) -> TokenStream {
    let mut options = quote!(::tablemap::model::FieldOptions::new());

    if attrs.primary_key {
        options.extend(quote!(.primary_key()));
    }
    if attrs.identity {
        options.extend(quote!(.identity()));
    }
    if attrs.computed {
        options.extend(quote!(.computed()));
    }
    if attrs.ignore {
        options.extend(quote!(.ignore_for_save()));
    }

    options
}

// Defaults: parent `id`, child `<owner>_id`.
fn join_keys(attrs: &FieldAttrs, owner: &str) -> TokenStream {
    let parent = attrs
        .parent_column
        .as_ref()
        .map_or_else(|| "id".to_string(), syn::LitStr::value);
    let child = attrs
        .child_column
        .as_ref()
        .map_or_else(|| format!("{}_id", owner.to_case(Case::Snake)), syn::LitStr::value);

    quote!(::tablemap::model::JoinKeys::new(#parent, #child))
}

fn inner_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };

    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
