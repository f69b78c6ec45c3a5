use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime;

/// A client registration row as served by the hosted record store.
///
/// `id` and `created_at` are set by the intake process and never written
/// from here; the contact fields are read-only. The remaining fields are
/// the operator-editable follow-up set. Date-time fields hold a canonical
/// RFC 3339 instant string or nothing; "not yet scheduled" is a valid
/// state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    #[serde(rename = "CalledOn")]
    pub called_on: Option<String>,
    #[serde(rename = "BOP_Date")]
    pub bop_date: Option<String>,
    #[serde(rename = "BOP_Status")]
    pub bop_status: Option<String>,
    #[serde(rename = "Followup_Date")]
    pub followup_date: Option<String>,
    #[serde(rename = "FollowUp_Status")]
    pub follow_up_status: Option<String>,
    #[serde(rename = "Product")]
    pub product: Option<String>,
    #[serde(rename = "Issued")]
    pub issued: Option<String>,
    #[serde(rename = "Comment")]
    pub comment: Option<String>,
    #[serde(rename = "Remark")]
    pub remark: Option<String>,
}

impl ClientRecord {
    /// Read the current value of an editable field.
    pub fn field(&self, field: EditableField) -> Option<&str> {
        match field {
            EditableField::CalledOn => self.called_on.as_deref(),
            EditableField::BopDate => self.bop_date.as_deref(),
            EditableField::BopStatus => self.bop_status.as_deref(),
            EditableField::FollowupDate => self.followup_date.as_deref(),
            EditableField::FollowUpStatus => self.follow_up_status.as_deref(),
            EditableField::Product => self.product.as_deref(),
            EditableField::Issued => self.issued.as_deref(),
            EditableField::Comment => self.comment.as_deref(),
            EditableField::Remark => self.remark.as_deref(),
        }
    }

    /// Overwrite a single editable field, leaving every other field as is.
    pub fn set_field(&mut self, field: EditableField, value: Option<String>) {
        let slot = match field {
            EditableField::CalledOn => &mut self.called_on,
            EditableField::BopDate => &mut self.bop_date,
            EditableField::BopStatus => &mut self.bop_status,
            EditableField::FollowupDate => &mut self.followup_date,
            EditableField::FollowUpStatus => &mut self.follow_up_status,
            EditableField::Product => &mut self.product,
            EditableField::Issued => &mut self.issued,
            EditableField::Comment => &mut self.comment,
            EditableField::Remark => &mut self.remark,
        };
        *slot = value;
    }
}

/// The closed set of operator-editable follow-up fields.
///
/// Identity, creation timestamp and the contact columns are deliberately
/// not representable here, which makes updates to them unconstructible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditableField {
    #[serde(rename = "CalledOn")]
    CalledOn,
    #[serde(rename = "BOP_Date")]
    BopDate,
    #[serde(rename = "BOP_Status")]
    BopStatus,
    #[serde(rename = "Followup_Date")]
    FollowupDate,
    #[serde(rename = "FollowUp_Status")]
    FollowUpStatus,
    #[serde(rename = "Product")]
    Product,
    #[serde(rename = "Issued")]
    Issued,
    #[serde(rename = "Comment")]
    Comment,
    #[serde(rename = "Remark")]
    Remark,
}

/// Whether an editable field holds an instant or free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    DateTime,
    Text,
}

impl EditableField {
    pub const ALL: [EditableField; 9] = [
        EditableField::CalledOn,
        EditableField::BopDate,
        EditableField::BopStatus,
        EditableField::FollowupDate,
        EditableField::FollowUpStatus,
        EditableField::Product,
        EditableField::Issued,
        EditableField::Comment,
        EditableField::Remark,
    ];

    /// The column name used by the hosted store.
    pub fn wire_name(self) -> &'static str {
        match self {
            EditableField::CalledOn => "CalledOn",
            EditableField::BopDate => "BOP_Date",
            EditableField::BopStatus => "BOP_Status",
            EditableField::FollowupDate => "Followup_Date",
            EditableField::FollowUpStatus => "FollowUp_Status",
            EditableField::Product => "Product",
            EditableField::Issued => "Issued",
            EditableField::Comment => "Comment",
            EditableField::Remark => "Remark",
        }
    }

    /// Parse a wire column name back into a field.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            EditableField::CalledOn
            | EditableField::BopDate
            | EditableField::FollowupDate
            | EditableField::Issued => FieldKind::DateTime,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for EditableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A normalized single-field update: exactly one field, one optional value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    pub field: EditableField,
    pub value: Option<String>,
}

impl FieldPatch {
    /// Build a patch from raw operator input.
    ///
    /// Date-time fields go through [`datetime::to_stored_in`], so an
    /// empty or unparseable value clears the field rather than erroring.
    /// Text fields keep their value unless it is blank after trimming.
    pub fn normalized<Tz: TimeZone>(field: EditableField, raw: &str, tz: &Tz) -> Self {
        let value = match field.kind() {
            FieldKind::DateTime => datetime::to_stored_in(raw, tz),
            FieldKind::Text => (!raw.trim().is_empty()).then(|| raw.to_owned()),
        };
        FieldPatch { field, value }
    }
}
