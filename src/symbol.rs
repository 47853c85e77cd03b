use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::error::LabelFormatError;
use crate::instr::{Cell, Label};
use crate::store::ProgramStore;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Symbol table of label -> index of its declaration.
///
/// Built once before execution and never modified during a run.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    table: FxMap<String, usize>,
    /// Names declared more than once, in order of the overriding declaration
    duplicates: Vec<String>,
}

impl LabelTable {
    /// Scan the store for label declarations, then check that every referenced label exists.
    pub fn build(store: &ProgramStore) -> Result<Self, LabelFormatError> {
        let mut labels = LabelTable::default();

        for (index, cell) in store.iter().enumerate() {
            match cell {
                Cell::Label(label) => {
                    if label.name().is_empty() {
                        return Err(LabelFormatError::EmptyName { index });
                    }
                    // Later declaration wins
                    if labels.table.insert(label.name().to_string(), index).is_some() {
                        labels.duplicates.push(label.name().to_string());
                    }
                }
                // A `NAME:` token with more tokens after it
                Cell::Raw(tokens) => {
                    if let Some(token) = tokens.iter().find(|tok| tok.ends_with(':')) {
                        return Err(LabelFormatError::NotAlone {
                            index,
                            token: token.clone(),
                        });
                    }
                }
                Cell::Instr(_) | Cell::Value(_) => (),
            }
        }

        for (index, cell) in store.iter().enumerate() {
            let Cell::Instr(instr) = cell else {
                continue;
            };
            if let Some(label) = instr.label() {
                if labels.get(label).is_none() {
                    return Err(LabelFormatError::Undefined {
                        index,
                        label: label.clone(),
                    });
                }
            }
        }

        Ok(labels)
    }

    /// Index of the declaration of `label`.
    pub fn get(&self, label: &Label) -> Option<usize> {
        self.table.get(label.name()).copied()
    }

    /// Index of the first cell after the declaration of `label`.
    pub fn target(&self, label: &Label) -> Option<usize> {
        self.get(label).map(|index| index + 1)
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Labels in order of first declaration.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.table.iter().map(|(name, index)| (name.as_str(), *index))
    }
}
