//! Prompts for drug interaction narratives.
//!
//! The user prompt embeds the three report sections as pretty-printed JSON.

use serde::Serialize;

/// System prompt shared by every provider.
pub const SYSTEM_PROMPT: &str = "You are a clinical pharmacology expert specializing in drug interaction analysis \
and medication safety. Provide evidence-based, cautious analysis while always emphasizing the need for \
professional medical consultation.";

/// User prompt template. Placeholders: `{normalization}`, `{interactions}`,
/// `{adverse_events}`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze these drug interaction data sources and provide both a simple summary and detailed analysis.

**DATA SOURCES:**
1. **RxNorm:** {normalization}
2. **DDInter:** {interactions}
3. **OpenFDA:** {adverse_events}

**OUTPUT FORMAT:**

## BOTTOM LINE
- **Risk Level**: [SAFE/LOW RISK/MODERATE RISK/HIGH RISK/AVOID]
- **What it means**: [Plain language - no medical terms]
- **What to do**: [Specific advice based on actual data found]
- **Important**: [Customized warning for this combination]

## DETAILED ANALYSIS
1. **Drug Summary** 2. **Interaction Analysis** 3. **Real-World Data** 4. **Clinical Recommendations** 5. **Limitations**

**KEY RULES:**
- Simple Summary: Use everyday language, under 50 words total, focus on actions
- Detailed Analysis: Medical terms OK, comprehensive technical information
- Be specific to these exact drugs and their interaction data
- Avoid generic advice like "consult your doctor" - explain WHY they should consult
- Reference actual findings (e.g., "moderate bleeding risk found" not "may interact")
- When analyzing multiple drugs, address ALL pairwise interactions found
- For 3+ drug combinations, assess cumulative risk from multiple interactions
- Don't focus only on the highest severity interaction - explain the overall combination safety
"#;

/// Render the analysis prompt from the three report sections.
pub fn build_analysis_prompt<N, I, A>(
    normalization: &N,
    interactions: &I,
    adverse_events: &A,
) -> Result<String, serde_json::Error>
where
    N: Serialize + ?Sized,
    I: Serialize + ?Sized,
    A: Serialize + ?Sized,
{
    let sections = [
        ("{normalization}", serde_json::to_string_pretty(normalization)?),
        ("{interactions}", serde_json::to_string_pretty(interactions)?),
        ("{adverse_events}", serde_json::to_string_pretty(adverse_events)?),
    ];
    Ok(render(ANALYSIS_PROMPT_TEMPLATE, &sections))
}

/// Single-pass substitution, so placeholder text inside a value is left alone.
fn render(template: &str, sections: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + sections.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match sections.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
