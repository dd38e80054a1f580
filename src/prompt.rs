//! Prompt builders.
//!
//! Every prompt is a pair: a fixed instruction block (sent as the system
//! prompt) and a per-request prompt built from the solution. The reply
//! contract for anything that edits a file is the same everywhere: the bare
//! token `NO`, or the complete file in one fenced code block.

use crate::component::Component;
use crate::solution::Solution;

/// Instructions for diagnosing and correcting one component.
pub const CORRECTION_INSTRUCTIONS: &str = "You are reviewing one file of a multi-file program \
that failed when it was run. You receive the program description, the content of every file, \
and the transcript of the failed run.\n\
Reply in exactly one of two ways:\n\
1. The single word NO, with nothing else, if this file needs no change.\n\
2. The complete corrected content of this file inside one fenced code block. \
Partial fixes, diffs and snippets are not accepted; the block replaces the whole file.\n\
Do not rename the file. Keep the `if __name__ == \"__main__\":` block in main.py.";

/// Instructions for applying a requested feature to one component.
pub const FEATURE_INSTRUCTIONS: &str = "You are improving one file of a multi-file program \
with a new feature.\n\
Decide whether the feature requires a change in this file.\n\
If it does, reply with the complete new content of the file inside one fenced code block \
and do not rename the file. If it does not, reply with the single word NO.\n\
Keep the file coherent and compatible with the other files of the program. \
main.py must keep its `if __name__ == \"__main__\":` block.";

/// Instructions for planning the components of a new solution.
pub const PLAN_INSTRUCTIONS: &str = "You are designing a Python program split into components, \
one file per component. Use as few components as possible. The last component is always \
main.py, which imports the others and runs the program from an \
`if __name__ == \"__main__\":` block without asking the user for input.\n\
Do not write any code yet. Reply in exactly this format, one line per entry:\n\
\n\
Description: <one paragraph describing the program>\n\
\n\
Component 1: <one paragraph describing the first component>\n\
\n\
File 1: <file name with extension>\n\
\n\
Component 2: ...\n\
\n\
File 2: main.py";

/// Instructions for writing the code of one planned component.
pub const COMPONENT_INSTRUCTIONS: &str = "You are writing the Python code for one component \
(exactly one file) of a program. Keep it coherent with the components already written: \
reuse their class and function names and do not repeat their code. main.py must import \
what it needs and end with an `if __name__ == \"__main__\":` block that runs the whole \
program without user input.\n\
Reply with the complete file inside one fenced code block.";

/// Instructions for the judge when exactly one provider replied.
pub const REFINE_INSTRUCTIONS: &str = "You are an expert evaluator. Analyze the provided \
response against the original instructions and prompt. If it is good, return it unchanged. \
If it can be improved, write a new response that fulfills the original request better.\n\
Output ONLY the final response, exactly in the format the original instructions require. \
Add no explanation, no preamble and no extra fence around the whole response.";

/// Instructions for the judge when several providers replied.
pub const SYNTHESIZE_INSTRUCTIONS: &str = "You are an expert evaluator. Several assistants \
answered the same request. Pick the best response, or write a new one that combines their \
strengths, so that it fulfills the original request.\n\
Output ONLY the final response, exactly in the format the original instructions require. \
Add no explanation, no preamble and no extra fence around the whole response.";

/// Diagnostic prompt for correcting `component` after a failed run.
///
/// Contains the solution name and description, every component's content,
/// the last run transcript verbatim, and optional user guidance.
pub fn correction_prompt(
    solution: &Solution,
    component: &Component,
    user_instructions: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Solution: {}\nDescription: {}\n\n{}\n\n\
         After trying to run the solution, the result was:\n\n{}\n\n\
         Review the component '{}'. If any improvements are needed, return ONLY the complete \
         corrected code inside a code block. It must be complete, not a partial fix. \
         If no changes are necessary, reply with 'NO'.",
        solution.name,
        solution.description,
        solution.context_listing(),
        solution.result_description,
        component.file_name(),
    );
    append_user_instructions(&mut prompt, user_instructions);
    prompt
}

/// Prompt asking for `feature` to be applied to `component`.
pub fn feature_prompt(solution: &Solution, component: &Component, feature: &str) -> String {
    format!(
        "The following solution needs a new feature or improvement:\n\n\
         Solution: {}\nComponent: {}\nLanguage: {}\nContent:\n{}\n\n\
         Improvement or issue: {}\n\n\
         Please improve this component if the feature requires it, keeping the original \
         file name and language.",
        solution.name,
        component.file_name(),
        component.language(),
        component.content,
        feature,
    )
}

/// Prompt asking for the component plan of a new solution.
pub fn plan_prompt(name: &str, description: &str) -> String {
    format!(
        "We are going to create the solution {} with the following description:\n\n{}\n",
        name, description
    )
}

/// Prompt asking for the code of one planned component. `written` holds the
/// components generated so far.
pub fn component_prompt(
    name: &str,
    description: &str,
    component_description: &str,
    file_name: &str,
    written: &[Component],
) -> String {
    let mut prompt = format!(
        "We are going to create the solution {} with the following description:\n\n{}\n\n",
        name, description
    );
    if !written.is_empty() {
        prompt.push_str("Components already written:\n");
        for c in written {
            prompt.push_str(&format!("{}:\n{}\n\n", c.file_name(), c.content));
        }
    }
    prompt.push_str(&format!(
        "{}\n\nPlease provide the implementation for the component {}.\n",
        component_description, file_name
    ));
    prompt
}

/// Judge prompt for one or more provider replies.
///
/// Every reply is embedded verbatim under its provider's name, between the
/// original instructions and the original prompt.
pub fn evaluation_prompt(instructions: &str, prompt: &str, replies: &[(&str, &str)]) -> String {
    let names: Vec<&str> = replies.iter().map(|(p, _)| *p).collect();
    let mut out = format!("Original Instructions:\n```\n{}\n```\n\n", instructions);

    for (provider, text) in replies {
        out.push_str(&format!("Response from {}:\n---\n{}\n---\n\n", provider, text));
    }

    out.push_str(&format!("Original Prompt:\n```\n{}\n```\n\n", prompt));

    if replies.len() == 1 {
        out.push_str(&format!(
            "Evaluate the response from {}. If it accurately and completely addresses the \
             original prompt according to the original instructions, return it directly. \
             Otherwise, write a new response that does. Output only the final response text.",
            names.join("")
        ));
    } else {
        out.push_str(&format!(
            "Compare the responses from {}. Return the best one, or synthesize a new response \
             combining their strengths that satisfies the original prompt according to the \
             original instructions. Output only the final response text.",
            names.join(", ")
        ));
    }
    out
}

fn append_user_instructions(prompt: &mut String, user_instructions: Option<&str>) {
    if let Some(extra) = user_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nUser Instructions:\n");
        prompt.push_str(extra);
    }
}
