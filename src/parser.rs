use crate::program::{
    CompilationUnit, DeclKind, Declaration, Field, Import, Program, TypeExpr, TypePath,
    MODULE_SEPARATOR,
};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::Path;
use syn::ext::IdentExt;
use syn::{AttrStyle, Attribute, Item, UseTree};

/// Source loader turning Rust code into the scanner's [`Program`] model.
///
/// The `AstParser` uses the `syn` crate to parse Rust source, then keeps only
/// what directive scanning needs: documentation comments, `use` imports and the
/// shape of type declarations. Inline `mod name { .. }` blocks become
/// compilation units of their own.
///
/// # Example
///
/// ```
/// use swagger_from_docs::parser::AstParser;
///
/// let program = AstParser::load_program(
///     "crate",
///     &[("crate::models", "/// A pet.\npub struct Pet { pub name: String }")],
/// )
/// .unwrap();
/// assert_eq!(program.units().len(), 1);
/// ```
pub struct AstParser;

/// Serde attributes that change how a field appears in the document.
#[derive(Debug, Clone, Default)]
struct SerdeAttributes {
    /// Renamed field name
    rename: Option<String>,
    /// Whether the field is skipped during serialization
    skip: bool,
}

impl AstParser {
    /// Parses a single Rust source file as module `module`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(module: &str, path: &Path) -> Result<Vec<CompilationUnit>> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let mut units = Self::parse_source(module, &content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;
        for unit in &mut units {
            unit.path = Some(path.to_path_buf());
        }
        Ok(units)
    }

    /// Parses Rust source text as module `module`.
    ///
    /// Returns the unit for `module` first, followed by one unit per inline
    /// module in source order.
    pub fn parse_source(module: &str, source: &str) -> Result<Vec<CompilationUnit>> {
        let syntax_tree = syn::parse_file(source)
            .with_context(|| format!("Failed to parse Rust syntax in module {}", module))?;

        let mut unit = CompilationUnit::new(module);
        unit.doc = doc_lines(
            syntax_tree
                .attrs
                .iter()
                .filter(|attr| matches!(attr.style, AttrStyle::Inner(_))),
        );

        let mut units = Vec::new();
        collect_items(&syntax_tree.items, &mut unit, &mut units);
        units.insert(0, unit);

        debug!(
            "Parsed module {} into {} unit(s)",
            module,
            units.len()
        );
        Ok(units)
    }

    /// Builds a program from `(module, source)` pairs.
    pub fn load_program(root: &str, sources: &[(&str, &str)]) -> Result<Program> {
        let mut program = Program::new(root);
        for (module, source) in sources {
            for unit in Self::parse_source(module, source)? {
                program.add_unit(unit);
            }
        }
        Ok(program)
    }
}

/// Walks items of one module, pushing nested inline modules to `nested`.
fn collect_items(items: &[Item], unit: &mut CompilationUnit, nested: &mut Vec<CompilationUnit>) {
    for item in items {
        match item {
            Item::Use(item_use) => {
                let mut prefix = Vec::new();
                flatten_use_tree(&item_use.tree, &mut prefix, &mut unit.imports);
            }
            Item::Struct(item_struct) => {
                let kind = match &item_struct.fields {
                    syn::Fields::Named(named) => DeclKind::Record(
                        named.named.iter().filter_map(parse_field).collect(),
                    ),
                    syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                        DeclKind::Alias(type_expr(&unnamed.unnamed[0].ty))
                    }
                    syn::Fields::Unnamed(_) => DeclKind::Other,
                    syn::Fields::Unit => DeclKind::Record(Vec::new()),
                };
                unit.declarations.push(Declaration {
                    name: item_struct.ident.unraw().to_string(),
                    doc: doc_lines(&item_struct.attrs),
                    kind,
                });
            }
            Item::Enum(item_enum) => {
                let unit_only = item_enum
                    .variants
                    .iter()
                    .all(|variant| matches!(variant.fields, syn::Fields::Unit));
                let kind = if unit_only {
                    DeclKind::Enum(
                        item_enum
                            .variants
                            .iter()
                            .map(|variant| {
                                parse_serde_attributes(&variant.attrs)
                                    .rename
                                    .unwrap_or_else(|| variant.ident.unraw().to_string())
                            })
                            .collect(),
                    )
                } else {
                    DeclKind::Other
                };
                unit.declarations.push(Declaration {
                    name: item_enum.ident.unraw().to_string(),
                    doc: doc_lines(&item_enum.attrs),
                    kind,
                });
            }
            Item::Type(item_type) => {
                unit.declarations.push(Declaration {
                    name: item_type.ident.unraw().to_string(),
                    doc: doc_lines(&item_type.attrs),
                    kind: DeclKind::Alias(type_expr(&item_type.ty)),
                });
            }
            Item::Fn(item_fn) => {
                unit.declarations.push(Declaration {
                    name: item_fn.sig.ident.unraw().to_string(),
                    doc: doc_lines(&item_fn.attrs),
                    kind: DeclKind::Function,
                });
            }
            Item::Impl(item_impl) => {
                // Handler methods may carry route directives
                for impl_item in &item_impl.items {
                    if let syn::ImplItem::Fn(method) = impl_item {
                        unit.declarations.push(Declaration {
                            name: method.sig.ident.unraw().to_string(),
                            doc: doc_lines(&method.attrs),
                            kind: DeclKind::Function,
                        });
                    }
                }
            }
            Item::Trait(item_trait) => {
                unit.declarations.push(Declaration {
                    name: item_trait.ident.unraw().to_string(),
                    doc: doc_lines(&item_trait.attrs),
                    kind: DeclKind::Other,
                });
            }
            Item::Const(item_const) => {
                unit.declarations.push(Declaration {
                    name: item_const.ident.unraw().to_string(),
                    doc: doc_lines(&item_const.attrs),
                    kind: DeclKind::Other,
                });
            }
            Item::Mod(item_mod) => {
                // `mod name;` lives in another file, loaded as its own unit
                if let Some((_, content)) = &item_mod.content {
                    let module = format!(
                        "{}{}{}",
                        unit.module,
                        MODULE_SEPARATOR,
                        item_mod.ident.unraw()
                    );
                    let mut child = CompilationUnit::new(module);
                    child.path = unit.path.clone();
                    child.doc = doc_lines(&item_mod.attrs);
                    let mut grandchildren = Vec::new();
                    collect_items(content, &mut child, &mut grandchildren);
                    nested.push(child);
                    nested.extend(grandchildren);
                }
            }
            _ => {}
        }
    }
}

/// Collects documentation comment lines from `#[doc = ".."]` attributes.
fn doc_lines<'a>(attrs: impl IntoIterator<Item = &'a Attribute>) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(name_value) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(text),
                ..
            }) = &name_value.value
            {
                // Block comments arrive as one attribute holding several lines
                lines.extend(text.value().lines().map(str::to_string));
            }
        }
    }
    lines
}

/// Parses a named field, dropping fields serde never serializes.
fn parse_field(field: &syn::Field) -> Option<Field> {
    let ident = field.ident.as_ref()?.unraw().to_string();
    let serde_attrs = parse_serde_attributes(&field.attrs);
    if serde_attrs.skip {
        debug!("Skipping serde(skip) field: {}", ident);
        return None;
    }

    Some(Field {
        name: serde_attrs.rename.unwrap_or_else(|| ident.clone()),
        ident,
        doc: doc_lines(&field.attrs),
        ty: type_expr(&field.ty),
    })
}

/// Parses Serde attributes from field or variant attributes
fn parse_serde_attributes(attrs: &[Attribute]) -> SerdeAttributes {
    let mut serde_attrs = SerdeAttributes::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(syn::Token![=]) {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    serde_attrs.rename = Some(value.value());
                } else {
                    // rename(serialize = "..", deserialize = "..")
                    meta.parse_nested_meta(|inner| {
                        let value: syn::LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            serde_attrs.rename = Some(value.value());
                        }
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde_attrs.skip = true;
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|inner| {
                    if inner.input.peek(syn::Token![=]) {
                        let _: syn::Expr = inner.value()?.parse()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        });

        if let Err(e) = result {
            warn!("Ignoring unparseable serde attribute: {}", e);
        }
    }

    serde_attrs
}

/// Reduces a `syn::Type` to a [`TypeExpr`].
fn type_expr(ty: &syn::Type) -> TypeExpr {
    match ty {
        syn::Type::Path(type_path) if type_path.qself.is_none() => path_expr(&type_path.path),
        syn::Type::Reference(reference) => type_expr(&reference.elem),
        syn::Type::Paren(paren) => type_expr(&paren.elem),
        syn::Type::Group(group) => type_expr(&group.elem),
        syn::Type::Array(array) => TypeExpr::Array(Box::new(type_expr(&array.elem))),
        syn::Type::Slice(slice) => TypeExpr::Array(Box::new(type_expr(&slice.elem))),
        syn::Type::Tuple(tuple) if tuple.elems.is_empty() => TypeExpr::Other("()".to_string()),
        syn::Type::Tuple(_) => TypeExpr::Other("tuple".to_string()),
        syn::Type::BareFn(_) => TypeExpr::Other("fn".to_string()),
        syn::Type::TraitObject(_) | syn::Type::ImplTrait(_) => {
            TypeExpr::Other("trait object".to_string())
        }
        _ => TypeExpr::Other("unknown".to_string()),
    }
}

/// Reduces a type path, unwrapping the std containers the document cares about.
fn path_expr(path: &syn::Path) -> TypeExpr {
    let Some(segment) = path.segments.last() else {
        return TypeExpr::Other("unknown".to_string());
    };
    let type_name = segment.ident.unraw().to_string();

    let mut generic_args = Vec::new();
    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
        for arg in &args.args {
            if let syn::GenericArgument::Type(inner_ty) = arg {
                generic_args.push(inner_ty);
            }
        }
    }

    match (type_name.as_str(), generic_args.as_slice()) {
        ("Option" | "Box" | "Rc" | "Arc" | "Cow", [inner, ..]) => type_expr(inner),
        ("Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet", [inner, ..]) => {
            TypeExpr::Array(Box::new(type_expr(inner)))
        }
        ("HashMap" | "BTreeMap" | "IndexMap", [_, value, ..]) => {
            TypeExpr::Map(Box::new(type_expr(value)))
        }
        _ => {
            let qualifier = path
                .segments
                .iter()
                .take(path.segments.len() - 1)
                .map(|s| s.ident.unraw().to_string())
                .collect();
            TypeExpr::Named(TypePath::new(qualifier, type_name))
        }
    }
}

/// Flattens a `use` tree into imports, tracking the path prefix.
fn flatten_use_tree(tree: &UseTree, prefix: &mut Vec<String>, imports: &mut Vec<Import>) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.unraw().to_string());
            flatten_use_tree(&path.tree, prefix, imports);
            prefix.pop();
        }
        UseTree::Name(name) => {
            let ident = name.ident.unraw().to_string();
            if ident == "self" {
                // use crate::models::{self}
                if let Some(last) = prefix.last() {
                    imports.push(Import {
                        alias: Some(last.clone()),
                        path: prefix.clone(),
                    });
                }
            } else {
                let mut path = prefix.clone();
                path.push(ident.clone());
                imports.push(Import {
                    alias: Some(ident),
                    path,
                });
            }
        }
        UseTree::Rename(rename) => {
            let alias = rename.rename.unraw().to_string();
            if alias == "_" {
                return;
            }
            let mut path = prefix.clone();
            let ident = rename.ident.unraw().to_string();
            if ident != "self" {
                path.push(ident);
            }
            imports.push(Import {
                alias: Some(alias),
                path,
            });
        }
        UseTree::Glob(_) => {
            imports.push(Import {
                alias: None,
                path: prefix.clone(),
            });
        }
        UseTree::Group(group) => {
            for item in &group.items {
                flatten_use_tree(item, prefix, imports);
            }
        }
    }
}
