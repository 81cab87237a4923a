//! Prompt construction for single-file code generation.

/// Everything the prompt templates can reference for one target file.
/// Missing upstream documents contribute empty strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInputs<'a> {
    pub filename: &'a str,
    pub design: &'a str,
    pub task: &'a str,
    pub code: &'a str,
    pub logs: &'a str,
    pub feedback: &'a str,
    pub user_requirement: &'a str,
    pub plan_and_change: &'a str,
}

/// Prompt for a normal (non-incremental) generation pass.
pub fn file_generation_prompt(inputs: &PromptInputs) -> String {
    format!(
        r#"# File Generation Task

You are generating exactly ONE file: {filename}

## Project Structure
The project has a specific structure:
- Project root/ (e.g., projectname/)
  - package.json (SINGLE package.json for the entire project)
  - frontend/ (Contains all frontend code)
  - backend/ (Contains all backend code)

## CRITICAL INSTRUCTIONS

1. Generate ONLY the file named: {filename}
2. Place this file EXACTLY at the path shown - DO NOT create any nested directories
3. Create complete, functional code - no placeholders
4. Use RELATIVE imports within the project structure

## IMPORTANT PATH RULES:
- CORRECT: projectname/package.json
- CORRECT: projectname/frontend/...
- CORRECT: projectname/backend/...
- WRONG: projectname/frontend/package.json
- WRONG: projectname/backend/package.json
- WRONG: projectname/frontend/frontend/...
- WRONG: projectname/backend/backend/...

## SPECIAL CASES:
- If {filename} is "package.json", include ALL necessary dependencies for BOTH frontend and backend

## Context for This File

Design Information:
{design}

Task Description:
{task}

Related Code:
```
{code}
```

Debug Information:
```
{logs}
```

Feedback:
{feedback}
"#,
        filename = inputs.filename,
        design = inputs.design,
        task = inputs.task,
        code = inputs.code,
        logs = inputs.logs,
        feedback = inputs.feedback,
    )
}

/// Prompt for an incremental regeneration pass. The code section already
/// leads with the rewritten-file marker produced by the context assembler.
pub fn incremental_generation_prompt(inputs: &PromptInputs) -> String {
    format!(
        r#"# Incremental File Regeneration Task

You are rewriting exactly ONE file: {filename}

The project already exists; reuse everything from the legacy code that is
still valid and change only what the new requirements demand.

## User Requirement
{user_requirement}

## Code Plan And Change
{plan_and_change}

## Design Information
{design}

## Task Description
{task}

## Legacy And Current Code
The file marked "to be rewritten" is the one you are regenerating; every
other block is context.
```
{code}
```

## Debug Information
```
{logs}
```

## Feedback
{feedback}

Generate the complete new content of {filename}.
"#,
        filename = inputs.filename,
        user_requirement = inputs.user_requirement,
        plan_and_change = inputs.plan_and_change,
        design = inputs.design,
        task = inputs.task,
        code = inputs.code,
        logs = inputs.logs,
        feedback = inputs.feedback,
    )
}
