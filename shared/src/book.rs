//! Catalog classification types

use serde::{Deserialize, Serialize};

/// Book category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookCategory {
    Fiction,
    NonFiction,
    Science,
    History,
    Children,
    Business,
    SelfHelp,
    Other,
}

/// Delivery format of a book.
///
/// 纸质书携带库存；数字书/有声书携带文件引用，没有库存概念。
/// 库存字段只在 `Physical` 上存在，杜绝了可空字段的歧义。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookFormat {
    Physical { stock: i64 },
    Digital { file_ref: String },
    Audiobook { file_ref: String },
}

impl BookFormat {
    /// Stock on hand, if the format tracks stock at all.
    pub fn stock(&self) -> Option<i64> {
        match self {
            BookFormat::Physical { stock } => Some(*stock),
            _ => None,
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, BookFormat::Physical { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_only_on_physical() {
        assert_eq!(BookFormat::Physical { stock: 3 }.stock(), Some(3));
        assert_eq!(
            BookFormat::Digital {
                file_ref: "blob/abc".into()
            }
            .stock(),
            None
        );
        assert_eq!(
            BookFormat::Audiobook {
                file_ref: "blob/def".into()
            }
            .stock(),
            None
        );
    }
}
