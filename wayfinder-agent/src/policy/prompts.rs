pub fn decider_system_prompt(home_url: &str) -> String {
    format!(
        r#"You are a web agent that uses the ReAct framework to decide on actions based on an accessibility tree in order to complete a task.
You will be provided with the accessibility tree of the current page and the action history, and must decide on the next action to take.
Each line of the tree is `<index> <role> '<name>'`; indentation shows nesting.
The actions you can take are:
- execute_click_action: Click on a web element
- execute_type_action: Type text into a web element and submit it
- execute_wait_action: Wait for a few seconds
- execute_go_back_action: Navigate back to the previous page
- execute_go_home_action: Navigate to the home page ({home_url})
- extract_data_from_element: Extract text content from a web element
The action must be in the format:
[idx, action, additional_info]
where:
- idx is the index of the target element in the accessibility tree (null for wait, go back and go home)
- action is one of the actions listed above
- additional_info is the text for execute_type_action, otherwise an empty string

Respond with a single JSON object and nothing else:
{{"thought": string, "action": [idx, action, additional_info]}}"#
    )
}

pub fn decider_user_prompt(task: &str, outline: &str, history_json: &str) -> String {
    let outline = if outline.is_empty() {
        "(the page has no actionable elements)"
    } else {
        outline
    };
    format!(
        "{outline}\nAction History:\n{history_json}\nBased on the above accessibility tree and action history, decide on the next action to take to complete the task: {task}"
    )
}

pub const JUDGE_SYSTEM_PROMPT: &str = r#"You decide whether a web agent has gathered enough information to answer its task.
You will be given the task, the data extracted so far and the accessibility tree of the current page.
Answer "FINAL ANSWER" when the task can be answered from this information, otherwise "CONTINUE".
Respond with a single JSON object and nothing else:
{"decision": "FINAL ANSWER" | "CONTINUE"}"#;

pub const ANSWER_SYSTEM_PROMPT: &str = r#"You write the final answer for a web agent's task.
Use the extracted data first and the accessibility tree of the current page as supporting context.
Be concise and answer the task directly.
Respond with a single JSON object and nothing else:
{"answer": string}"#;

pub fn findings_user_prompt(task: &str, extracted_json: &str, outline: &str) -> String {
    format!("Task: {task}\n\nExtracted data:\n{extracted_json}\n\nAccessibility tree:\n{outline}")
}
