use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase,
};
use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Error, Fields, LitStr, parse_macro_input};

pub fn record_derive_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct RecordAttrs {
    name: Option<String>,
    rename_all: Option<LitStr>,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;
    let (impl_gen, ty_gen, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    ident,
                    "`#[derive(Record)]` requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                ident,
                "`#[derive(Record)]` can only be applied to structs",
            ));
        }
    };

    let record = record_attrs(&input.attrs)?;
    let type_name = record.name.unwrap_or_else(|| ident.to_string());

    let mut names = Vec::new();
    let mut members = Vec::new();
    let mut types = Vec::new();
    for field in fields {
        let attrs = field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        // named fields always carry an ident
        let Some(member) = &field.ident else {
            continue;
        };
        let raw = member.to_string();
        let raw = raw.trim_start_matches("r#");
        let name = match (attrs.rename, &record.rename_all) {
            (Some(name), _) => name,
            (None, Some(rule)) => rename_with(rule, raw)?,
            (None, None) => raw.to_string(),
        };
        names.push(name);
        members.push(member);
        types.push(&field.ty);
    }

    Ok(quote! {
        impl #impl_gen ::qscript::IntoValue for #ident #ty_gen #where_clause {
            fn into_value(self) -> ::qscript::Value {
                ::qscript::Value::Record(
                    ::qscript::RecordValue::new(#type_name)
                        #( .field(#names, self.#members) )*
                )
            }
        }

        impl #impl_gen ::qscript::HasValueType for #ident #ty_gen #where_clause {
            fn value_type() -> ::qscript::ValueType {
                ::qscript::ValueType::record(#type_name)
            }
        }

        impl #impl_gen ::qscript::Record for #ident #ty_gen #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            fn properties() -> ::std::vec::Vec<(&'static str, ::qscript::ValueType)> {
                ::std::vec![
                    #( (#names, <#types as ::qscript::HasValueType>::value_type()) ),*
                ]
            }
        }
    })
}

fn record_attrs(attrs: &[Attribute]) -> syn::Result<RecordAttrs> {
    let mut out = RecordAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("rename_all") {
                out.rename_all = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `name` or `rename_all`"))
            }
        })?;
    }
    Ok(out)
}

fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("skip") {
                out.skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `rename` or `skip`"))
            }
        })?;
    }
    Ok(out)
}

fn rename_with(rule: &LitStr, name: &str) -> syn::Result<String> {
    let renamed = match rule.value().as_str() {
        "camelCase" => name.to_lower_camel_case(),
        "PascalCase" => name.to_upper_camel_case(),
        "snake_case" => name.to_snake_case(),
        "SCREAMING_SNAKE_CASE" => name.to_shouty_snake_case(),
        "kebab-case" => name.to_kebab_case(),
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        other => {
            return Err(Error::new_spanned(
                rule,
                format!("unknown rename rule `{other}`"),
            ));
        }
    };
    Ok(renamed)
}
