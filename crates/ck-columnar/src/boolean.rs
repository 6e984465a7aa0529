use ck_selection::Selection;

use crate::kind::{BooleanKind, CellKind};
use crate::{BooleanColumn, Column, ColumnError, check_lengths};

const TRUE: i8 = 1;
const FALSE: i8 = 0;

impl BooleanColumn {
    pub fn append_bool(&mut self, value: bool) {
        self.push_native(BooleanKind::encode(value));
    }

    pub fn is_true(&self) -> Selection {
        self.select_native(|v| v == TRUE)
    }

    pub fn is_false(&self) -> Selection {
        self.select_native(|v| v == FALSE)
    }

    #[must_use]
    pub fn count_true(&self) -> usize {
        self.natives().iter().filter(|v| **v == TRUE).count()
    }

    #[must_use]
    pub fn count_false(&self) -> usize {
        self.natives().iter().filter(|v| **v == FALSE).count()
    }

    /// Share of non-missing cells that are true; `NaN` when none are present.
    #[must_use]
    pub fn proportion_true(&self) -> f64 {
        let present = self.size() - self.count_missing();
        if present == 0 {
            return f64::NAN;
        }
        self.count_true() as f64 / present as f64
    }

    /// Rows that are true in both columns. Missing cells are never true.
    pub fn and(&self, other: &Self) -> Result<Selection, ColumnError> {
        check_lengths(self.size(), other.size())?;
        Ok(self.is_true().intersection(&other.is_true()))
    }

    pub fn or(&self, other: &Self) -> Result<Selection, ColumnError> {
        check_lengths(self.size(), other.size())?;
        Ok(self.is_true().union(&other.is_true()))
    }
}
