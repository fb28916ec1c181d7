//! Validators for repeated fields (line items, tag lists)

use std::collections::BTreeSet;

pub fn validate_min_items<T>(items: &[T], min: usize) -> Result<(), String> {
    if items.len() >= min {
        Ok(())
    } else {
        Err(format!("Add at least {} item{}", min, if min == 1 { "" } else { "s" }))
    }
}

pub fn validate_max_items<T>(items: &[T], max: usize) -> Result<(), String> {
    if items.len() <= max {
        Ok(())
    } else {
        Err(format!("No more than {} items allowed", max))
    }
}

/// Fails on the first repeated item
pub fn validate_unique<T: Ord>(items: &[T]) -> Result<(), String> {
    let mut seen = BTreeSet::new();
    if items.iter().all(|item| seen.insert(item)) {
        Ok(())
    } else {
        Err("Items must be unique".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_counts() {
        assert!(validate_min_items(&[1], 1).is_ok());
        assert_eq!(
            validate_min_items::<u8>(&[], 1),
            Err("Add at least 1 item".to_string())
        );
        assert!(validate_max_items(&[1, 2, 3], 2).is_err());
    }

    #[test]
    fn uniqueness() {
        assert!(validate_unique(&["a", "b"]).is_ok());
        assert!(validate_unique(&["a", "b", "a"]).is_err());
    }
}
