//! Structural checks applied to every provider result.

use crate::models::{ContentRequest, QuestionKind, StudyMaterials};
use crate::providers::ProviderError;

/// Drop unusable items and trim surplus down to the requested counts.
///
/// Questions or flashcards with a blank required field are removed, as are
/// multiple choice questions with fewer than two choices or whose answer is
/// not one of them. Order within each kind is preserved.
pub fn normalize(mut materials: StudyMaterials, request: &ContentRequest) -> StudyMaterials {
    let mut kept = [0usize; 4];

    materials.questions.retain(|q| {
        if q.question.trim().is_empty() || q.answer.trim().is_empty() {
            return false;
        }
        if q.kind == QuestionKind::MultipleChoice {
            let usable = q
                .choices
                .as_ref()
                .map_or(0, |c| c.iter().filter(|c| !c.trim().is_empty()).count());
            if usable < 2 || !q.answer_in_choices() {
                return false;
            }
        }

        let slot = QuestionKind::ALL
            .iter()
            .position(|k| *k == q.kind)
            .unwrap_or_default();
        if kept[slot] < request.count_for(q.kind) {
            kept[slot] += 1;
            true
        } else {
            false
        }
    });

    materials
        .flashcards
        .retain(|c| !c.front.trim().is_empty() && !c.back.trim().is_empty());
    materials.flashcards.truncate(request.flashcards);

    if !request.summary {
        materials.summary.clear();
        materials.key_concepts.clear();
        materials.applications = None;
        materials.formulas = None;
    }

    materials
}

/// Check that (normalized) materials satisfy every requested count.
pub fn validate(materials: &StudyMaterials, request: &ContentRequest) -> Result<(), ProviderError> {
    let mut missing = Vec::new();

    for kind in QuestionKind::ALL {
        let wanted = request.count_for(kind);
        let got = materials.count_of(kind);
        if got < wanted {
            missing.push(format!("{} of {} {} questions", got, wanted, kind.id()));
        }
    }
    if materials.flashcards.len() < request.flashcards {
        missing.push(format!(
            "{} of {} flashcards",
            materials.flashcards.len(),
            request.flashcards
        ));
    }
    if request.summary && materials.summary.trim().is_empty() {
        missing.push("empty summary".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::Incomplete(missing.join(", ")))
    }
}
