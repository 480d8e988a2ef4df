use crate::error::Error;
use crate::schema::{Field, FieldKind, MemberDecl, StructType, Type, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A variant as declared: an optional tag name and the branch members
#[derive(Clone, Debug)]
pub struct VariantType {
    name: Option<String>,
    tag: Option<String>,
    branches: Vec<MemberDecl>,
}

impl VariantType {
    pub fn new(name: Option<String>, tag: Option<String>, branches: Vec<MemberDecl>) -> Self {
        Self {
            name,
            tag,
            branches,
        }
    }

    /// The same variant with a use-site tag, e.g. `variant name <tag> field;`
    pub fn with_tag(&self, tag: String) -> Self {
        Self {
            tag: Some(tag),
            ..self.clone()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn branches(&self) -> &[MemberDecl] {
        &self.branches
    }

    pub fn align(&self) -> u32 {
        self.branches
            .iter()
            .map(|b| b.ty.align())
            .fold(1, u32::max)
    }
}

/// Members a branch contributes to its overlaid layout. A struct branch is
/// flattened so its fields become siblings of the tag.
fn branch_members(branch: &MemberDecl) -> Vec<MemberDecl> {
    match &branch.ty {
        Type::Struct(s) if branch.dims.is_empty() => s.decls().to_vec(),
        _ => vec![branch.clone()],
    }
}

/// A variant resolved inside its enclosing struct
#[derive(Debug)]
pub struct VariantSelector {
    name: String,
    tag: String,
    tag_index: usize,
    branches: BTreeMap<String, Arc<StructType>>,
}

impl VariantSelector {
    /// `decls` are the enclosing struct's members with the variant at `idx`,
    /// `earlier` the fields already resolved before it
    pub(crate) fn resolve(
        struct_name: &Option<String>,
        member: &str,
        variant: &VariantType,
        decls: &[MemberDecl],
        idx: usize,
        earlier: &[Field],
        min_align: u32,
    ) -> Result<Self, Error> {
        let tag = variant
            .tag()
            .ok_or_else(|| Error::UntaggedVariant(member.to_owned()))?;
        let tag_index = earlier
            .iter()
            .rposition(|f| f.name() == tag)
            .ok_or_else(|| Error::UnresolvedReference {
                field: member.to_owned(),
                reference: tag.to_owned(),
            })?;
        if !matches!(earlier[tag_index].kind(), FieldKind::Value(Type::Enum(_))) {
            return Err(Error::VariantTagNotEnum {
                variant: member.to_owned(),
                tag: tag.to_owned(),
            });
        }

        let mut branches = BTreeMap::new();
        for branch in variant.branches() {
            let mut overlay = decls[..idx].to_vec();
            overlay.extend(branch_members(branch));
            overlay.extend_from_slice(&decls[idx + 1..]);
            let layout = StructType::build(struct_name.clone(), overlay, min_align)?;
            branches.insert(branch.name.clone(), layout);
        }

        Ok(Self {
            name: member.to_owned(),
            tag: tag.to_owned(),
            tag_index,
            branches,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn tag_index(&self) -> usize {
        self.tag_index
    }

    pub fn branch(&self, label: &str) -> Option<&Arc<StructType>> {
        self.branches.get(label)
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, &Arc<StructType>)> {
        self.branches.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn align(&self) -> u32 {
        self.branches.values().map(|b| b.align()).fold(1, u32::max)
    }

    /// Pick the branch layout for an already decoded tag value
    pub(crate) fn select(&self, values: &[Value]) -> Result<&Arc<StructType>, Error> {
        let label = values
            .get(self.tag_index)
            .and_then(Value::label)
            .ok_or_else(|| Error::VariantTagNotEnum {
                variant: self.name.clone(),
                tag: self.tag.clone(),
            })?;
        self.branches
            .get(label)
            .ok_or_else(|| Error::UnknownVariantBranch {
                variant: self.name.clone(),
                label: label.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{BitRead, MemReader};
    use crate::schema::{EnumRange, EnumType, IntType, StringType};
    use crate::types::ByteOrder;
    use pretty_assertions::assert_eq;

    fn int(size: u32) -> Type {
        Type::Int(Arc::new(IntType::new(size, None, false).unwrap()))
    }

    fn kind_enum() -> Type {
        Type::Enum(Arc::new(EnumType::new(
            None,
            Arc::new(IntType::new(8, None, false).unwrap()),
            vec![EnumRange::new(0, 0, "a"), EnumRange::new(1, 1, "b")],
        )))
    }

    // struct {
    //   enum : uint8_t { a = 0, b = 1 } kind;
    //   variant <kind> {
    //     struct { uint32_t count; } a;
    //     struct { uint16_t x; uint16_t y; string label; } b;
    //   } v;
    //   uint8_t trailer;
    // }
    fn tagged_layout() -> Arc<StructType> {
        let a = StructType::build(None, vec![MemberDecl::new("count", int(32))], 1).unwrap();
        let b = StructType::build(
            None,
            vec![
                MemberDecl::new("x", int(16)),
                MemberDecl::new("y", int(16)),
                MemberDecl::new("label", Type::String(StringType::default())),
            ],
            1,
        )
        .unwrap();
        let v = VariantType::new(
            None,
            Some("kind".into()),
            vec![
                MemberDecl::new("a", Type::Struct(a)),
                MemberDecl::new("b", Type::Struct(b)),
            ],
        );
        StructType::build(
            Some("tagged".into()),
            vec![
                MemberDecl::new("kind", kind_enum()),
                MemberDecl::new("v", Type::Variant(Arc::new(v))),
                MemberDecl::new("trailer", int(8)),
            ],
            1,
        )
        .unwrap()
    }

    fn names(rec: &crate::schema::Record) -> Vec<&str> {
        rec.fields().map(|(f, _)| f.name()).collect()
    }

    #[test]
    fn selects_branch_by_tag() {
        let layout = tagged_layout();
        let mut data = vec![1u8];
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(b"pt\0");
        data.push(9);
        let mut r = MemReader::new(data, ByteOrder::LittleEndian);

        let rec = layout.decode(&mut r).unwrap();
        assert_eq!(names(&rec), vec!["kind", "x", "y", "label", "trailer"]);
        assert_eq!(rec.get("kind").and_then(Value::label), Some("b"));
        assert_eq!(rec.uint("x"), Some(3));
        assert_eq!(rec.uint("y"), Some(4));
        assert_eq!(rec.get("label").and_then(Value::as_str), Some("pt"));
        assert_eq!(rec.uint("trailer"), Some(9));
        assert!(rec.get("count").is_none());
        assert_eq!(r.position(), 9 * 8);
    }

    #[test]
    fn selector_keeps_one_layout_per_branch() {
        let layout = tagged_layout();
        assert_eq!(layout.fields().len(), 2);
        let selector = match layout.fields()[1].kind() {
            FieldKind::Variant(s) => s.clone(),
            other => panic!("expected a variant field, got {other:?}"),
        };
        assert_eq!(selector.name(), "v");
        assert_eq!(selector.tag(), "kind");
        assert_eq!(selector.tag_index(), 0);

        let branches: Vec<(&str, Vec<&str>)> = selector
            .branches()
            .map(|(label, l)| (label, l.fields().iter().map(Field::name).collect()))
            .collect();
        assert_eq!(
            branches,
            vec![
                ("a", vec!["kind", "count", "trailer"]),
                ("b", vec!["kind", "x", "y", "label", "trailer"]),
            ]
        );
        assert!(selector.branch("c").is_none());
    }

    #[test]
    fn other_branch_has_its_own_layout() {
        let layout = tagged_layout();
        let mut data = vec![0u8];
        data.extend_from_slice(&77u32.to_le_bytes());
        data.push(1);
        let mut r = MemReader::new(data, ByteOrder::LittleEndian);

        let rec = layout.decode(&mut r).unwrap();
        assert_eq!(names(&rec), vec!["kind", "count", "trailer"]);
        assert_eq!(rec.uint("count"), Some(77));
        assert_eq!(r.position(), 6 * 8);
    }

    #[test]
    fn branch_fields_shadow_the_tag() {
        // LTTng's extended event header repeats `id` inside the branch
        let ext = StructType::build(None, vec![MemberDecl::new("id", int(32))], 1).unwrap();
        let v = VariantType::new(
            None,
            Some("id".into()),
            vec![MemberDecl::new("b", Type::Struct(ext))],
        );
        let layout = StructType::build(
            None,
            vec![
                MemberDecl::new("id", kind_enum()),
                MemberDecl::new("v", Type::Variant(Arc::new(v))),
            ],
            1,
        )
        .unwrap();
        let mut data = vec![1u8];
        data.extend_from_slice(&4000u32.to_le_bytes());
        let rec = layout
            .decode(&mut MemReader::new(data, ByteOrder::LittleEndian))
            .unwrap();
        assert_eq!(rec.uint("id"), Some(4000));
    }

    #[test]
    fn tag_must_be_an_earlier_enum() {
        let v = Arc::new(VariantType::new(None, Some("kind".into()), Vec::new()));
        let missing = StructType::build(
            None,
            vec![MemberDecl::new("v", Type::Variant(v.clone()))],
            1,
        );
        assert!(matches!(missing, Err(Error::UnresolvedReference { .. })));

        let not_enum = StructType::build(
            None,
            vec![
                MemberDecl::new("kind", int(8)),
                MemberDecl::new("v", Type::Variant(v)),
            ],
            1,
        );
        assert!(matches!(not_enum, Err(Error::VariantTagNotEnum { .. })));
    }

    #[test]
    fn unknown_branch_label() {
        let v = VariantType::new(
            None,
            Some("kind".into()),
            vec![MemberDecl::new("a", int(8))],
        );
        let layout = StructType::build(
            None,
            vec![
                MemberDecl::new("kind", kind_enum()),
                MemberDecl::new("v", Type::Variant(Arc::new(v))),
            ],
            1,
        )
        .unwrap();
        let mut r = MemReader::new(vec![1, 0], ByteOrder::LittleEndian);
        assert!(matches!(
            layout.decode(&mut r),
            Err(Error::UnknownVariantBranch { label, .. }) if label == "b"
        ));
        assert_eq!(r.position(), 8);
    }
}
