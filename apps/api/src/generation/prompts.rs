//! Prompt templates for the generation endpoints.

pub fn enhance_summary_prompt(content: &str) -> String {
    format!(
        "Improve the following professional summary to make it more impactful \
         and ATS-friendly. Keep it concise and focused on key achievements:\n\n\
         {content}\n\n\
         Return only the improved summary text without any additional \
         formatting or explanation."
    )
}

pub fn enhance_skills_prompt(content: &str) -> String {
    format!(
        "Improve the following skills section to make it more comprehensive \
         and ATS-friendly. Organize skills by category if possible:\n\n\
         {content}\n\n\
         Return only the improved skills text without any additional \
         formatting or explanation."
    )
}

pub fn interview_questions_prompt(
    job_description: &str,
    num_questions: u8,
    question_types: &[String],
) -> String {
    format!(
        "Based on the following job description, generate {num_questions} \
         interview questions.\n\
         The questions should be a mix of the following types: {}.\n\
         For each question, specify its type (technical, behavioral, or situational).\n\
         The questions should be directly related to the skills and \
         qualifications mentioned in the job description.\n\
         Return the result as a JSON array of objects with fields: question, type.\n\n\
         Job Description:\n{job_description}",
        question_types.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_prompt_includes_count_and_types() {
        let prompt = interview_questions_prompt(
            "Senior Rust engineer",
            5,
            &["technical".to_string(), "behavioral".to_string()],
        );
        assert!(prompt.contains("generate 5"));
        assert!(prompt.contains("technical, behavioral"));
        assert!(prompt.contains("Senior Rust engineer"));
    }

    #[test]
    fn test_enhance_prompts_embed_content() {
        assert!(enhance_summary_prompt("built things").contains("built things"));
        assert!(enhance_skills_prompt("Rust, SQL").contains("Rust, SQL"));
    }
}
