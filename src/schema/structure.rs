use crate::error::Error;
use crate::reader::BitRead;
use crate::schema::{ArrayLen, MemberDecl, Record, Type, Value, VariantSelector};
use std::sync::{Arc, OnceLock};

// Upper bound on speculative allocation for arrays whose length comes from the data
const MAX_PREALLOC: usize = 4096;

#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    kind: FieldKind,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The scalar or compound type at the bottom of any array dimensions
    pub fn element_type(&self) -> Option<&Type> {
        self.kind.element_type()
    }
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    Value(Type),
    FixedArray {
        element: Box<FieldKind>,
        len: usize,
    },
    DynamicArray {
        element: Box<FieldKind>,
        length_index: usize,
        length_field: String,
    },
    Variant(Arc<VariantSelector>),
}

impl FieldKind {
    pub fn align(&self) -> u32 {
        match self {
            FieldKind::Value(t) => t.align(),
            FieldKind::FixedArray { element, .. } | FieldKind::DynamicArray { element, .. } => {
                element.align()
            }
            FieldKind::Variant(v) => v.align(),
        }
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            FieldKind::Value(t) => Some(t),
            FieldKind::FixedArray { element, .. } | FieldKind::DynamicArray { element, .. } => {
                element.element_type()
            }
            FieldKind::Variant(_) => None,
        }
    }

    /// `siblings` are the values decoded so far for the enclosing struct
    fn decode<R: BitRead + ?Sized>(&self, r: &mut R, siblings: &[Value]) -> Result<Value, Error> {
        match self {
            FieldKind::Value(t) => t.decode(r),
            FieldKind::FixedArray { element, len } => decode_array(r, element, *len, siblings),
            FieldKind::DynamicArray {
                element,
                length_index,
                length_field,
            } => {
                let len = siblings[*length_index]
                    .as_u64()
                    .ok_or_else(|| Error::NotAnInteger(length_field.clone()))?;
                decode_array(r, element, len as usize, siblings)
            }
            FieldKind::Variant(v) => Err(Error::DetachedVariant(v.name().to_owned())),
        }
    }
}

fn decode_array<R: BitRead + ?Sized>(
    r: &mut R,
    element: &FieldKind,
    len: usize,
    siblings: &[Value],
) -> Result<Value, Error> {
    r.align(element.align())?;
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        items.push(element.decode(r, siblings)?);
    }
    Ok(Value::Array(items))
}

/// A structure layout.
///
/// Sibling references (dynamic array lengths, variant tags) are resolved to
/// field positions when the layout is built. A variant member ends the layout:
/// each of its branches owns a complete layout of its own made of the fields
/// before the variant, the branch's fields and the fields after the variant.
#[derive(Debug)]
pub struct StructType {
    name: Option<String>,
    fields: Vec<Field>,
    decls: Vec<MemberDecl>,
    min_align: u32,
    align: OnceLock<u32>,
}

impl StructType {
    pub fn build(
        name: Option<String>,
        decls: Vec<MemberDecl>,
        min_align: u32,
    ) -> Result<Arc<Self>, Error> {
        if !min_align.is_power_of_two() {
            return Err(Error::InvalidAlignment(min_align.into()));
        }
        let mut fields: Vec<Field> = Vec::with_capacity(decls.len());
        for (idx, decl) in decls.iter().enumerate() {
            let kind = match &decl.ty {
                Type::Variant(v) => {
                    if !decl.dims.is_empty() {
                        return Err(Error::DetachedVariant(decl.name.clone()));
                    }
                    let selector =
                        VariantSelector::resolve(&name, &decl.name, v, &decls, idx, &fields, min_align)?;
                    fields.push(Field {
                        name: decl.name.clone(),
                        kind: FieldKind::Variant(Arc::new(selector)),
                    });
                    break;
                }
                ty => resolve_kind(&decl.name, ty, &decl.dims, &fields)?,
            };
            fields.push(Field {
                name: decl.name.clone(),
                kind,
            });
        }
        Ok(Arc::new(Self {
            name,
            fields,
            decls,
            min_align,
            align: OnceLock::new(),
        }))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The member declarations this layout was built from
    pub fn decls(&self) -> &[MemberDecl] {
        &self.decls
    }

    pub fn align(&self) -> u32 {
        *self.align.get_or_init(|| {
            self.fields
                .iter()
                .map(|f| f.kind.align())
                .fold(self.min_align.max(1), u32::max)
        })
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().rposition(|f| f.name == name)
    }

    pub fn decode<R: BitRead + ?Sized>(self: &Arc<Self>, r: &mut R) -> Result<Record, Error> {
        r.align(self.align())?;
        self.decode_from(r, Vec::with_capacity(self.fields.len()))
    }

    /// Continue decoding with `values` holding the first `values.len()` fields
    pub(crate) fn decode_from<R: BitRead + ?Sized>(
        self: &Arc<Self>,
        r: &mut R,
        mut values: Vec<Value>,
    ) -> Result<Record, Error> {
        let start = values.len();
        for field in &self.fields[start..] {
            if let FieldKind::Variant(v) = &field.kind {
                let branch = v.select(&values)?;
                return branch.decode_from(r, values);
            }
            let value = field.kind.decode(r, &values)?;
            values.push(value);
        }
        Ok(Record::new(Arc::clone(self), values))
    }
}

fn resolve_kind(
    name: &str,
    ty: &Type,
    dims: &[ArrayLen],
    earlier: &[Field],
) -> Result<FieldKind, Error> {
    let mut kind = FieldKind::Value(ty.clone());
    for dim in dims.iter().rev() {
        kind = match dim {
            ArrayLen::Fixed(len) => FieldKind::FixedArray {
                element: Box::new(kind),
                len: *len,
            },
            ArrayLen::Field(reference) => {
                let length_index = earlier
                    .iter()
                    .rposition(|f| f.name == *reference)
                    .filter(|i| {
                        matches!(
                            earlier[*i].kind,
                            FieldKind::Value(Type::Int(_) | Type::Enum(_))
                        )
                    })
                    .ok_or_else(|| Error::UnresolvedReference {
                        field: name.to_owned(),
                        reference: reference.clone(),
                    })?;
                FieldKind::DynamicArray {
                    element: Box::new(kind),
                    length_index,
                    length_field: reference.clone(),
                }
            }
        };
    }
    Ok(kind)
}
