use crate::domain::model::Stakeholder;

pub const DEFAULT_BUFFER_MARKER: &str = "MB";

/// Stakeholder picked to absorb remainders and correction transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSelection {
    /// Position in the project's stakeholder list.
    pub index: usize,
    /// `false` when the policy had to fall back instead of finding its designated buffer.
    pub designated: bool,
}

impl BufferSelection {
    pub fn designated(index: usize) -> Self {
        Self {
            index,
            designated: true,
        }
    }

    pub fn fallback(index: usize) -> Self {
        Self {
            index,
            designated: false,
        }
    }
}

pub trait BufferSelectionPolicy: Send + Sync {
    fn select(&self, stakeholders: &[Stakeholder]) -> Option<BufferSelection>;
}

impl<F> BufferSelectionPolicy for F
where
    F: Fn(&[Stakeholder]) -> Option<BufferSelection> + Send + Sync,
{
    fn select(&self, stakeholders: &[Stakeholder]) -> Option<BufferSelection> {
        self(stakeholders)
    }
}

/// Picks the stakeholder named after the marker (case-insensitive), else the last one.
#[derive(Debug, Clone)]
pub struct MarkerPolicy {
    marker: String,
}

impl MarkerPolicy {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().trim().to_lowercase(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MarkerPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_MARKER)
    }
}

impl BufferSelectionPolicy for MarkerPolicy {
    fn select(&self, stakeholders: &[Stakeholder]) -> Option<BufferSelection> {
        stakeholders
            .iter()
            .position(|s| s.name.trim().to_lowercase() == self.marker)
            .map(BufferSelection::designated)
            .or_else(|| stakeholders.len().checked_sub(1).map(BufferSelection::fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::StakeholderId;

    fn stakeholders(names: &[&str]) -> Vec<Stakeholder> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Stakeholder {
                id: StakeholderId(i as u32 + 1),
                name: name.to_string(),
                global_target: None,
            })
            .collect()
    }

    #[test]
    fn test_marker_match_is_case_insensitive() {
        let list = stakeholders(&["Architecte", "mb", "BET Fluides"]);
        assert_eq!(
            MarkerPolicy::default().select(&list),
            Some(BufferSelection::designated(1))
        );
    }

    #[test]
    fn test_falls_back_to_last_stakeholder() {
        let list = stakeholders(&["Architecte", "BET Structure", "BET Fluides"]);
        assert_eq!(
            MarkerPolicy::default().select(&list),
            Some(BufferSelection::fallback(2))
        );
    }

    #[test]
    fn test_no_stakeholders_no_buffer() {
        assert_eq!(MarkerPolicy::default().select(&[]), None);
    }

    #[test]
    fn test_closure_policy() {
        let first = |list: &[Stakeholder]| (!list.is_empty()).then(|| BufferSelection::designated(0));
        let list = stakeholders(&["Architecte", "MB"]);
        assert_eq!(first.select(&list), Some(BufferSelection::designated(0)));
    }

    #[test]
    fn test_custom_marker() {
        let list = stakeholders(&["Architecte", "Mandataire"]);
        let policy = MarkerPolicy::new(" MANDATAIRE ");
        assert_eq!(policy.marker(), "mandataire");
        assert_eq!(policy.select(&list), Some(BufferSelection::designated(1)));
    }
}
