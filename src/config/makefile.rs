//! Simplified `Makefile` reader
//!
//! Only the parts of make that map onto tasks are understood: rules,
//! tab-prefixed recipes, prerequisites and a handful of automatic variables.
//! Every target is treated as phony. The result is the same data tree the
//! other formats produce, with all rules under a `recipes` key.

use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Key the rules are stored under
pub const RECIPES_KEY: &str = "recipes";

#[derive(Debug, Default)]
struct Rule {
    prerequisites: Vec<String>,
    recipe: Vec<String>,
    help: Option<String>,
    keep_going: bool,
}

/// Ordered rules; redefining a target replaces it in place
#[derive(Default)]
struct Rules {
    order: Vec<String>,
    rules: HashMap<String, Rule>,
}

impl Rules {
    fn reset(&mut self, target: &str) {
        if !self.rules.contains_key(target) {
            self.order.push(target.to_string());
        }
        self.rules.insert(target.to_string(), Rule::default());
    }

    fn each<'a>(&'a mut self, targets: &'a [String]) -> impl Iterator<Item = &'a mut Rule> + 'a {
        self.rules
            .iter_mut()
            .filter(move |(name, _)| targets.contains(*name))
            .map(|(_, rule)| rule)
    }
}

/// Parse Makefile text into `{"recipes": {target: {...}}}`
pub fn loads(text: &str) -> Value {
    let text = text.replace("\r\n", "\n");
    let lines: Vec<&str> = text.split('\n').collect();

    let mut rules = Rules::default();
    let mut prefix = String::from("\t");
    let mut targets: Vec<String> = Vec::new();
    let mut in_recipe = false;
    let mut i = 0;

    while i < lines.len() {
        let raw = lines[i];
        i += 1;

        if in_recipe {
            if let Some(rest) = raw.strip_prefix(prefix.as_str()) {
                // backslash/newline pairs are passed to the shell untouched
                let mut line = rest.to_string();
                while line.ends_with('\\') && i < lines.len() {
                    let next = lines[i];
                    i += 1;
                    line.push('\n');
                    line.push_str(next.strip_prefix(prefix.as_str()).unwrap_or(next));
                }

                let keep_going = line.starts_with('-');
                if keep_going {
                    line.remove(0);
                }
                for rule in rules.each(&targets) {
                    rule.keep_going |= keep_going;
                    rule.recipe.push(line.clone());
                }
                continue;
            }
            targets.clear();
            in_recipe = false;
        }

        if raw.trim().is_empty() || raw.starts_with('#') {
            continue;
        }

        // outside recipes, backslash/newline collapses into one space
        let mut line = raw.to_string();
        while line.ends_with('\\') && i < lines.len() {
            line.pop();
            let joined = format!("{} {}", line.trim_end(), lines[i].trim_start());
            line = joined;
            i += 1;
        }

        if line.starts_with(".PHONY") {
            continue;
        }
        if line.starts_with(".RECIPEPREFIX") {
            let value = line
                .split_once('=')
                .map(|(_, v)| v.trim())
                .unwrap_or_default();
            prefix = value
                .chars()
                .next()
                .map(String::from)
                .unwrap_or_else(|| String::from("\t"));
            continue;
        }

        let Some((head, rest)) = line.split_once(':') else {
            continue;
        };
        if head.contains('=') || rest.starts_with('=') || rest.starts_with(":=") {
            continue; // variable assignment
        }

        in_recipe = true;
        targets = head.split_whitespace().map(String::from).collect();
        for target in &targets {
            rules.reset(target);
        }

        let mut rest = rest.to_string();
        if let Some((before, help)) = rest.split_once('#') {
            let help = help.trim().to_string();
            for rule in rules.each(&targets) {
                rule.help = Some(help.clone());
            }
            rest = before.to_string();
        }
        if let Some((before, recipe)) = rest.split_once(';') {
            for rule in rules.each(&targets) {
                rule.recipe.push(recipe.trim_start().to_string());
            }
            rest = before.to_string();
        }
        let prerequisites: Vec<String> = rest.split_whitespace().map(String::from).collect();
        for rule in rules.each(&targets) {
            rule.prerequisites.extend(prerequisites.iter().cloned());
        }
    }

    let mut recipes = Map::new();
    for name in &rules.order {
        let Some(rule) = rules.rules.get(name) else {
            continue;
        };
        recipes.insert(name.clone(), rule_value(name, rule, &rules));
    }

    let mut root = Map::new();
    root.insert(RECIPES_KEY.to_string(), Value::Object(recipes));
    Value::Object(root)
}

fn rule_value(name: &str, rule: &Rule, rules: &Rules) -> Value {
    let deps: Vec<&str> = rule
        .prerequisites
        .iter()
        .map(|d| d.strip_prefix('-').unwrap_or(d))
        .collect();
    let mut unique: Vec<&str> = Vec::new();
    for dep in &deps {
        if !unique.contains(dep) {
            unique.push(dep);
        }
    }

    let mut shell = rule.recipe.join("\n");
    shell = shell.replace("$@", name);
    if let Some(first) = deps.first() {
        shell = shell.replace("$<", first);
    }
    shell = shell.replace("$?", &deps.join(" "));
    shell = shell.replace("$^", &unique.join(" "));

    // prerequisites that are not targets are files, not tasks
    let composite: Vec<String> = rule
        .prerequisites
        .iter()
        .filter(|d| rules.rules.contains_key(d.strip_prefix('-').unwrap_or(d)))
        .map(|d| match d.strip_prefix('-') {
            Some(rest) => format!("+{}", rest),
            None => d.clone(),
        })
        .collect();

    let mut value = json!({
        "composite": composite,
        "shell": shell,
        "verbatim": true,
    });
    if let Some(help) = &rule.help {
        value["help"] = json!(help);
    }
    if rule.keep_going {
        value["keep_going"] = json!(true);
    }
    value
}
