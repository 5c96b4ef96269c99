use syn::{Attribute, Error, LitInt, LitStr, Path, spanned::Spanned};

///
/// EntityAttrs
///

#[derive(Default)]
pub struct EntityAttrs {
    pub table: Option<LitStr>,
    pub database: Option<LitStr>,
    pub prefix_database_name: bool,
    pub backend: Option<LitStr>,
    pub assign_keys: Option<Path>,
}

impl EntityAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("entity")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    out.table = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("database") {
                    out.database = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("prefix_database_name") {
                    out.prefix_database_name = true;
                } else if meta.path.is_ident("backend") {
                    out.backend = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("assign_keys") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.assign_keys = Some(lit.parse()?);
                } else {
                    return Err(meta.error("unknown entity attribute"));
                }

                Ok(())
            })?;
        }

        if out.prefix_database_name && out.database.is_none() {
            return Err(Error::new(
                proc_macro2::Span::call_site(),
                "prefix_database_name requires database = \"...\"",
            ));
        }

        Ok(out)
    }
}

///
/// FieldRole
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FieldRole {
    #[default]
    Scalar,
    OneToMany,
    OneToOne,
    Skip,
}

///
/// FieldAttrs
///

#[derive(Default)]
pub struct FieldAttrs {
    pub role: FieldRole,
    pub primary_key: bool,
    pub identity: bool,
    pub computed: bool,
    pub ignore: bool,
    pub required: bool,
    pub max_length: Option<LitInt>,
    pub parent_column: Option<LitStr>,
    pub child_column: Option<LitStr>,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        let mut roles = Vec::new();

        for attr in attrs.iter().filter(|a| a.path().is_ident("field")) {
            attr.parse_nested_meta(|meta| {
                let path = &meta.path;
                if path.is_ident("primary_key") {
                    out.primary_key = true;
                } else if path.is_ident("identity") {
                    out.identity = true;
                } else if path.is_ident("computed") {
                    out.computed = true;
                } else if path.is_ident("ignore") {
                    out.ignore = true;
                } else if path.is_ident("required") {
                    out.required = true;
                } else if path.is_ident("max_length") {
                    out.max_length = Some(meta.value()?.parse()?);
                } else if path.is_ident("one_to_many") {
                    roles.push((FieldRole::OneToMany, path.span()));
                } else if path.is_ident("one_to_one") {
                    roles.push((FieldRole::OneToOne, path.span()));
                } else if path.is_ident("skip") {
                    roles.push((FieldRole::Skip, path.span()));
                } else if path.is_ident("parent_column") {
                    out.parent_column = Some(meta.value()?.parse()?);
                } else if path.is_ident("child_column") {
                    out.child_column = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown field attribute"));
                }

                Ok(())
            })?;
        }

        if let [_, (_, span), ..] = roles.as_slice() {
            return Err(Error::new(
                *span,
                "choose one of one_to_many, one_to_one, or skip",
            ));
        }
        if let Some((role, _)) = roles.first() {
            out.role = *role;
        }

        out.check()?;

        Ok(out)
    }

    fn check(&self) -> syn::Result<()> {
        let call_site = proc_macro2::Span::call_site();

        if self.identity && self.computed {
            return Err(Error::new(call_site, "a field cannot be both identity and computed"));
        }

        match self.role {
            FieldRole::Scalar => {
                if let Some(lit) = self.parent_column.as_ref().or(self.child_column.as_ref()) {
                    return Err(Error::new(
                        lit.span(),
                        "join columns apply to one_to_many and one_to_one fields only",
                    ));
                }
            }
            FieldRole::OneToMany | FieldRole::OneToOne => {
                let scalar_only = self.primary_key
                    || self.identity
                    || self.computed
                    || self.required
                    || self.max_length.is_some();
                if scalar_only {
                    return Err(Error::new(
                        call_site,
                        "association fields take only parent_column and child_column",
                    ));
                }
            }
            FieldRole::Skip => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn field_attrs(attr: Attribute) -> syn::Result<FieldAttrs> {
        FieldAttrs::parse(&[attr])
    }

    #[test]
    fn entity_attrs_read_every_key() {
        let attrs: Vec<Attribute> = vec![parse_quote! {
            #[entity(table = "Users", database = "crm", prefix_database_name, backend = "main")]
        }];

        let parsed = EntityAttrs::parse(&attrs).expect("parse");

        assert_eq!(parsed.table.map(|l| l.value()).as_deref(), Some("Users"));
        assert_eq!(parsed.database.map(|l| l.value()).as_deref(), Some("crm"));
        assert!(parsed.prefix_database_name);
        assert_eq!(parsed.backend.map(|l| l.value()).as_deref(), Some("main"));
    }

    #[test]
    fn prefix_without_database_is_rejected() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[entity(prefix_database_name)])];

        assert!(EntityAttrs::parse(&attrs).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(EntityAttrs::parse(&[parse_quote!(#[entity(tabel = "x")])]).is_err());
        assert!(field_attrs(parse_quote!(#[field(primary)])).is_err());
    }

    #[test]
    fn scalar_flags_are_collected() {
        let parsed = field_attrs(parse_quote!(#[field(primary_key, identity, max_length = 40)]))
            .expect("parse");

        assert_eq!(parsed.role, FieldRole::Scalar);
        assert!(parsed.primary_key && parsed.identity);
        assert_eq!(
            parsed.max_length.map(|l| l.base10_parse::<usize>().expect("int")),
            Some(40)
        );
    }

    #[test]
    fn conflicting_roles_are_rejected() {
        assert!(field_attrs(parse_quote!(#[field(one_to_many, one_to_one)])).is_err());
        assert!(field_attrs(parse_quote!(#[field(identity, computed)])).is_err());
        assert!(field_attrs(parse_quote!(#[field(one_to_many, primary_key)])).is_err());
        assert!(field_attrs(parse_quote!(#[field(parent_column = "id")])).is_err());
    }

    #[test]
    fn association_keys_are_read() {
        let parsed = field_attrs(parse_quote! {
            #[field(one_to_one, parent_column = "id", child_column = "owner_id")]
        })
        .expect("parse");

        assert_eq!(parsed.role, FieldRole::OneToOne);
        assert_eq!(parsed.child_column.map(|l| l.value()).as_deref(), Some("owner_id"));
    }
}
