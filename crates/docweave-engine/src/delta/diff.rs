use crate::delta::{Delta, DeltaError, InsertValue, Op, RetainValue};
use crate::models::attributes::Attributes;

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnitValue<'a> {
    Char(char),
    Embed,
    Nested(&'a Delta),
}

/// One document unit with the attributes it was inserted with
#[derive(Debug, Clone, Copy)]
struct Unit<'a> {
    value: UnitValue<'a>,
    attributes: Option<&'a Attributes>,
}

impl Unit<'_> {
    fn same_as(&self, other: &Unit<'_>) -> bool {
        self.value == other.value && attributes_eq(self.attributes, other.attributes)
    }

    /// Same content, possibly different attributes
    fn compatible(&self, other: &Unit<'_>) -> bool {
        match (self.value, other.value) {
            (UnitValue::Char(a), UnitValue::Char(b)) => a == b,
            (UnitValue::Embed, UnitValue::Embed) => true,
            (UnitValue::Nested(_), UnitValue::Nested(_)) => true,
            _ => false,
        }
    }

    fn to_insert(self) -> Op {
        let value = match self.value {
            UnitValue::Char(c) => InsertValue::Text(c.to_string()),
            UnitValue::Embed => InsertValue::Count(1),
            UnitValue::Nested(nested) => InsertValue::Nested(nested.clone()),
        };
        Op::Insert {
            value,
            attributes: self.attributes.cloned(),
        }
    }
}

fn attributes_eq(a: Option<&Attributes>, b: Option<&Attributes>) -> bool {
    a.filter(|a| !a.is_empty()) == b.filter(|b| !b.is_empty())
}

fn units(delta: &Delta) -> Result<Vec<Unit<'_>>, DeltaError> {
    let mut units = Vec::with_capacity(delta.length());
    for op in delta.ops() {
        let Op::Insert { value, attributes } = op else {
            return Err(DeltaError::NotADocument);
        };
        let attributes = attributes.as_ref();
        match value {
            InsertValue::Text(text) => units.extend(text.chars().map(|c| Unit {
                value: UnitValue::Char(c),
                attributes,
            })),
            InsertValue::Count(count) => units.extend((0..*count).map(|_| Unit {
                value: UnitValue::Embed,
                attributes,
            })),
            InsertValue::Nested(nested) => units.push(Unit {
                value: UnitValue::Nested(nested),
                attributes,
            }),
        }
    }
    Ok(units)
}

impl Delta {
    /// The change turning document `self` into document `other`.
    ///
    /// Common leading and trailing units are retained. When the differing
    /// middle keeps the same content and only attributes or nested structure
    /// changed, it becomes attributed retains and nested retains (recursing
    /// into tables); otherwise it is deleted and re-inserted.
    pub fn diff(&self, other: &Delta) -> Result<Delta, DeltaError> {
        let old = units(self)?;
        let new = units(other)?;

        let prefix = old
            .iter()
            .zip(&new)
            .take_while(|(a, b)| a.same_as(b))
            .count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a.same_as(b))
            .count();

        let old_mid = &old[prefix..old.len() - suffix];
        let new_mid = &new[prefix..new.len() - suffix];

        let mut delta = Delta::new().retain(prefix, None);
        let in_place = old_mid.len() == new_mid.len()
            && old_mid.iter().zip(new_mid).all(|(a, b)| a.compatible(b));
        if in_place {
            for (a, b) in old_mid.iter().zip(new_mid) {
                let attributes = Attributes::diff(a.attributes, b.attributes);
                let value = match (a.value, b.value) {
                    (UnitValue::Nested(x), UnitValue::Nested(y)) if x != y => {
                        RetainValue::Nested(x.diff(y)?)
                    }
                    _ => RetainValue::Count(1),
                };
                delta.push(Op::Retain { value, attributes });
            }
        } else {
            delta.push(Op::Delete(old_mid.len()));
            for unit in new_mid {
                delta.push(unit.to_insert());
            }
        }
        Ok(delta.chop())
    }
}
