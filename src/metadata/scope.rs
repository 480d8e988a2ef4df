use crate::error::Error;
use crate::schema::{EnumType, IntType, StructType, Type, VariantType};
use std::collections::HashMap;
use std::sync::Arc;

/// Names declared by one metadata parse.
///
/// Aliases, struct names, variant names and enum names live in separate
/// namespaces, as in C. Identical inline integer declarations share one
/// `Arc<IntType>` through the integer cache.
#[derive(Debug, Default)]
pub struct Scope {
    aliases: HashMap<String, Type>,
    structs: HashMap<String, Arc<StructType>>,
    variants: HashMap<String, Arc<VariantType>>,
    enums: HashMap<String, Arc<EnumType>>,
    ints: HashMap<IntType, Arc<IntType>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later declarations replace earlier ones
    pub fn add_alias(&mut self, name: impl Into<String>, ty: Type) {
        self.aliases.insert(name.into(), ty);
    }

    pub fn alias(&self, name: &str) -> Result<&Type, Error> {
        self.aliases.get(name).ok_or_else(|| Error::UnknownType {
            kind: "type",
            name: name.to_owned(),
        })
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn add_struct(&mut self, name: impl Into<String>, ty: Arc<StructType>) {
        self.structs.insert(name.into(), ty);
    }

    pub fn struct_named(&self, name: &str) -> Result<Arc<StructType>, Error> {
        self.structs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType {
                kind: "struct",
                name: name.to_owned(),
            })
    }

    pub fn add_variant(&mut self, name: impl Into<String>, ty: Arc<VariantType>) {
        self.variants.insert(name.into(), ty);
    }

    pub fn variant_named(&self, name: &str) -> Result<Arc<VariantType>, Error> {
        self.variants
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType {
                kind: "variant",
                name: name.to_owned(),
            })
    }

    pub fn add_enum(&mut self, name: impl Into<String>, ty: Arc<EnumType>) {
        self.enums.insert(name.into(), ty);
    }

    pub fn enum_named(&self, name: &str) -> Result<Arc<EnumType>, Error> {
        self.enums
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType {
                kind: "enum",
                name: name.to_owned(),
            })
    }

    /// The shared instance of an integer declaration
    pub fn intern_int(&mut self, int: IntType) -> Arc<IntType> {
        self.ints
            .entry(int)
            .or_insert_with_key(|k| Arc::new(k.clone()))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_separate() {
        let mut scope = Scope::new();
        let int = scope.intern_int(IntType::new(8, None, false).unwrap());
        scope.add_alias("thing", Type::Int(int.clone()));
        scope.add_enum(
            "thing",
            Arc::new(EnumType::new(Some("thing".into()), int, Vec::new())),
        );
        assert!(matches!(scope.alias("thing"), Ok(Type::Int(_))));
        assert!(scope.has_alias("thing"));
        assert!(!scope.has_alias("other"));
        assert!(scope.enum_named("thing").is_ok());
        assert!(matches!(
            scope.struct_named("thing"),
            Err(Error::UnknownType { kind: "struct", .. })
        ));
        assert!(matches!(
            scope.variant_named("thing"),
            Err(Error::UnknownType { kind: "variant", .. })
        ));
    }

    #[test]
    fn identical_integers_are_shared() {
        let mut scope = Scope::new();
        let a = scope.intern_int(IntType::new(32, None, false).unwrap());
        let b = scope.intern_int(IntType::new(32, None, false).unwrap());
        let c = scope.intern_int(IntType::new(32, Some(32), false).unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
