use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DataEnum, DeriveInput, Expr, ExprTuple, Fields, GenericArgument, PathArguments, Type,
    meta::ParseNestedMeta, parse::Parse, parse_macro_input,
};

/// Derives `Element` and `Record` for structs with named fields, or
/// `Element` for unit-only enums tagged with `#[frame(repr = ...)]`.
#[proc_macro_derive(Element, attributes(frame))]
pub fn element_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = match &input.data {
        Data::Struct(s) => expand_record(&input, &s.fields),
        Data::Enum(e) => expand_tagged_enum(&input, e),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input,
            "Element cannot be derived for unions.",
        )),
    };

    match expanded {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => e.to_compile_error().into(),
    }
}

fn get_value_from_attrs<T: Parse>(
    attrs: &[syn::Attribute],
    attr_name: &str,
    attr_key: &str,
) -> syn::Result<Option<T>> {
    let mut ret_val = None;

    for attr in attrs {
        if !attr.path().is_ident(attr_name) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(attr_key) {
                let value = meta.value()?;
                let parsed: T = value.parse()?;
                ret_val = Some(parsed);
            }
            Ok(())
        })?;
    }

    Ok(ret_val)
}

enum ByteOrderOverride {
    Big,
    Little,
}

enum BoundOption {
    Count(Expr),
    Counter(Expr),
    Until(Expr, Expr),
    WhileNot(Expr, Expr),
    IfEquals(Expr, Expr),
    Repeat,
    Delimited {
        terminator: Expr,
        divider: Expr,
        escape: Expr,
    },
    SizeBy(Expr),
    Align(Expr),
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    base: bool,
    transient: bool,
    reference: bool,
    byte_order: Option<ByteOrderOverride>,
    bound: Option<BoundOption>,
    publish: Vec<Expr>,
}

impl FieldOptions {
    fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("frame") {
                continue;
            }
            attr.parse_nested_meta(|meta| options.parse_meta(&meta))?;
        }

        Ok(options)
    }

    fn parse_meta(&mut self, meta: &ParseNestedMeta) -> syn::Result<()> {
        let Some(key) = meta.path.get_ident().map(ToString::to_string) else {
            return Err(meta.error("expected a frame attribute name"));
        };

        match key.as_str() {
            "skip" => self.skip = true,
            "base" => self.base = true,
            "transient" => self.transient = true,
            "reference" => self.reference = true,
            "big" => self.byte_order = Some(ByteOrderOverride::Big),
            "little" => self.byte_order = Some(ByteOrderOverride::Little),
            "publish" => self.publish.push(meta.value()?.parse()?),
            "count" => self.set_bound(meta, BoundOption::Count(meta.value()?.parse()?))?,
            "counter" => self.set_bound(meta, BoundOption::Counter(meta.value()?.parse()?))?,
            "size_by" => self.set_bound(meta, BoundOption::SizeBy(meta.value()?.parse()?))?,
            "align" => self.set_bound(meta, BoundOption::Align(meta.value()?.parse()?))?,
            "repeat" => self.set_bound(meta, BoundOption::Repeat)?,
            "until" => {
                let (field, value) = parse_pair(meta)?;
                self.set_bound(meta, BoundOption::Until(field, value))?;
            }
            "while_not" => {
                let (field, value) = parse_pair(meta)?;
                self.set_bound(meta, BoundOption::WhileNot(field, value))?;
            }
            "if_equals" => {
                let (field, value) = parse_pair(meta)?;
                self.set_bound(meta, BoundOption::IfEquals(field, value))?;
            }
            "delimited" => {
                let delimited = parse_delimited(meta)?;
                self.set_bound(meta, delimited)?;
            }
            _ => return Err(meta.error(format!("unknown frame attribute `{key}`"))),
        }

        Ok(())
    }

    fn set_bound(&mut self, meta: &ParseNestedMeta, bound: BoundOption) -> syn::Result<()> {
        if self.bound.is_some() {
            return Err(meta.error("a field takes at most one bound"));
        }
        self.bound = Some(bound);
        Ok(())
    }
}

/// `key = (FieldRef, value)`
fn parse_pair(meta: &ParseNestedMeta) -> syn::Result<(Expr, Expr)> {
    let tuple: ExprTuple = meta.value()?.parse()?;
    let mut elems = tuple.elems.iter();
    match (elems.next(), elems.next(), elems.next()) {
        (Some(field), Some(value), None) => Ok((field.clone(), value.clone())),
        _ => Err(syn::Error::new_spanned(
            &tuple,
            "expected a `(field, value)` pair",
        )),
    }
}

/// `delimited(terminator = .., divider = .., escape = ..)`, each part optional
fn parse_delimited(meta: &ParseNestedMeta) -> syn::Result<BoundOption> {
    let mut terminator: Expr = syn::parse_quote!(b"\r\n");
    let mut divider: Expr = syn::parse_quote!(b',');
    let mut escape: Expr = syn::parse_quote!(b'"');

    if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| {
            if inner.path.is_ident("terminator") {
                terminator = inner.value()?.parse()?;
            } else if inner.path.is_ident("divider") {
                divider = inner.value()?.parse()?;
            } else if inner.path.is_ident("escape") {
                escape = inner.value()?.parse()?;
            } else {
                return Err(inner.error("expected `terminator`, `divider` or `escape`"));
            }
            Ok(())
        })?;
    }

    Ok(BoundOption::Delimited {
        terminator,
        divider,
        escape,
    })
}

/// `T` out of `Wrapper<T>`
fn inner_type<'a>(ty: &'a Type, wrapper: &str) -> syn::Result<&'a Type> {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == wrapper {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return Ok(inner);
                    }
                }
            }
        }
    }

    Err(syn::Error::new_spanned(
        ty,
        format!("this bound needs a `{wrapper}<_>` field"),
    ))
}

fn strategy_for(ty: &Type, options: &FieldOptions) -> syn::Result<proc_macro2::TokenStream> {
    let strategy = match &options.bound {
        None => quote! { ::frame_reader::bound::Direct::<#ty>::new() },
        Some(BoundOption::Count(count)) => {
            let inner = inner_type(ty, "Vec")?;
            quote! { ::frame_reader::bound::FixedCount::<#inner>::new(#count) }
        }
        Some(BoundOption::Counter(counter)) => {
            let inner = inner_type(ty, "Vec")?;
            quote! { ::frame_reader::bound::CounterReference::<#inner, _, _>::new(#counter) }
        }
        Some(BoundOption::Until(field, value)) => {
            let inner = inner_type(ty, "Vec")?;
            quote! { ::frame_reader::bound::CriterionEquality::<#inner, _>::new(#field, #value) }
        }
        Some(BoundOption::WhileNot(field, value)) => {
            let inner = inner_type(ty, "Vec")?;
            quote! {
                ::frame_reader::bound::ComparisonInequality::<#inner, _, _>::new(#field, #value)
            }
        }
        Some(BoundOption::IfEquals(field, value)) => {
            let inner = inner_type(ty, "Option")?;
            quote! {
                ::frame_reader::bound::OptionalIfEquals::<#inner, _, _>::new(#field, #value)
            }
        }
        Some(BoundOption::Repeat) => {
            let inner = inner_type(ty, "Vec")?;
            quote! { ::frame_reader::bound::UnboundedRepeat::<#inner>::new() }
        }
        Some(BoundOption::Delimited {
            terminator,
            divider,
            escape,
        }) => {
            let inner = inner_type(ty, "Vec")?;
            quote! {
                ::frame_reader::bound::EscapedDelimited::<#inner>::new(#terminator, #divider, #escape)
            }
        }
        Some(BoundOption::SizeBy(size)) => {
            quote! { ::frame_reader::bound::SizedBy::<#ty, _, _>::new(#size) }
        }
        Some(BoundOption::Align(alignment)) => {
            quote! { ::frame_reader::bound::Align(#alignment) }
        }
    };

    Ok(match options.byte_order {
        Some(ByteOrderOverride::Big) => quote! { ::frame_reader::bound::Endian::big(#strategy) },
        Some(ByteOrderOverride::Little) => {
            quote! { ::frame_reader::bound::Endian::little(#strategy) }
        }
        None => strategy,
    })
}

fn expand_record(input: &DeriveInput, fields: &Fields) -> syn::Result<proc_macro2::TokenStream> {
    let Fields::Named(named_fields) = fields else {
        return Err(syn::Error::new_spanned(
            fields,
            "Element can only be derived for structs with named fields.",
        ));
    };

    let struct_name = &input.ident;
    let vis = &input.vis;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let size = get_value_from_attrs::<Expr>(&input.attrs, "frame", "size")?;

    let mut base_fields = Vec::new();
    let mut base_views = Vec::new();
    let mut own_fields = Vec::new();
    let mut field_refs = Vec::new();

    for field in &named_fields.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let options = FieldOptions::from_attrs(&field.attrs)?;
        let name = ident.to_string();
        let const_ident = format_ident!("{}", name.trim_start_matches("r#").to_uppercase());

        if options.transient || options.reference {
            field_refs.push(quote! {
                #vis const #const_ident: ::frame_reader::FieldRef<Self, #ty> =
                    ::frame_reader::FieldRef::new(#name, |record: &Self| {
                        ::core::clone::Clone::clone(&record.#ident)
                    });
            });
        }

        if options.skip {
            continue;
        }

        if options.base {
            base_fields.push(quote! {
                fields.extend(
                    <#ty as ::frame_reader::Record>::fields()
                        .into_iter()
                        .map(|field| field.lift::<Self>(|record: &mut Self| &mut record.#ident)),
                );
            });
            base_views.push(quote! {
                if let ::core::option::Option::Some(view) =
                    ::frame_reader::Record::view(&self.#ident, type_id)
                {
                    return ::core::option::Option::Some(view);
                }
            });
            continue;
        }

        let strategy = strategy_for(ty, &options)?;
        let mut builder = quote! { ::frame_reader::Field::<Self>::bind(#name, #strategy) };
        if options.transient {
            builder = quote! { #builder.transient(Self::#const_ident) };
        }
        for target in &options.publish {
            builder = quote! { #builder.publish(#target) };
        }

        own_fields.push(quote! {
            fields.push(#builder.assign(|record: &mut Self, value| record.#ident = value));
        });
    }

    let upper_bound = size.map(|size| {
        quote! {
            fn upper_bound(
                _reader: &::frame_reader::Reader<'_>,
            ) -> ::frame_reader::Result<::core::option::Option<usize>> {
                ::core::result::Result::Ok(::core::option::Option::Some(#size))
            }
        }
    });

    let field_ref_impl = if field_refs.is_empty() {
        quote! {}
    } else {
        quote! {
            impl #impl_generics #struct_name #ty_generics #where_clause {
                #(#field_refs)*
            }
        }
    };

    Ok(quote! {
        #field_ref_impl

        impl #impl_generics ::frame_reader::Record for #struct_name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::frame_reader::Field<Self>> {
                let mut fields = ::std::vec::Vec::new();
                #(#base_fields)*
                #(#own_fields)*
                fields
            }

            fn view(
                &self,
                type_id: ::core::any::TypeId,
            ) -> ::core::option::Option<&dyn ::core::any::Any> {
                if type_id == ::core::any::TypeId::of::<Self>() {
                    return ::core::option::Option::Some(self);
                }
                #(#base_views)*
                ::core::option::Option::None
            }
        }

        impl #impl_generics ::frame_reader::Element for #struct_name #ty_generics #where_clause {
            #upper_bound

            fn read_frame(
                reader: &mut ::frame_reader::Reader<'_>,
                symbol: &'static str,
            ) -> ::frame_reader::Result<Self> {
                reader.fill_record::<Self>(symbol)
            }
        }
    })
}

fn expand_tagged_enum(
    input: &DeriveInput,
    data: &DataEnum,
) -> syn::Result<proc_macro2::TokenStream> {
    let Some(repr) = get_value_from_attrs::<Type>(&input.attrs, "frame", "repr")? else {
        return Err(syn::Error::new_spanned(
            input,
            "Element on enums needs `#[frame(repr = u8)]` or another integer type.",
        ));
    };

    let enum_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut arms = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Element can only be derived for enums with unit variants.",
            ));
        }
        let variant_ident = &variant.ident;
        arms.push(quote! {
            raw if raw == Self::#variant_ident as #repr => {
                ::core::option::Option::Some(Self::#variant_ident)
            }
        });
    }

    Ok(quote! {
        impl #impl_generics ::frame_reader::Element for #enum_name #ty_generics #where_clause {
            fn upper_bound(
                _reader: &::frame_reader::Reader<'_>,
            ) -> ::frame_reader::Result<::core::option::Option<usize>> {
                ::core::result::Result::Ok(::core::option::Option::Some(
                    <#repr as ::frame_reader::Primitive>::SIZE,
                ))
            }

            fn read_frame(
                reader: &mut ::frame_reader::Reader<'_>,
                symbol: &'static str,
            ) -> ::frame_reader::Result<Self> {
                reader.read_tag::<#repr, Self>(symbol, |raw| match raw {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                })
            }
        }
    })
}
