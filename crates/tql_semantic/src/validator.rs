//! Document validator.
//!
//! Validation runs in two passes. The first visits every operation and
//! fragment definition once, checking each selection against the schema and
//! recording the variable usages and fragment spreads of every definition.
//! The second follows spreads transitively to check the variables of each
//! operation, fragment cycles and unused fragments.
//!
//! Required variables are always checked. Provided values are coerced only
//! once the document itself is valid.

use crate::diagnostics::DiagnosticBag;
use crate::operation::{select_operation, Operation, OperationKind};
use crate::variables::{check_required_variables, coerce_variable_values};
use graphql_parser::query::{
    Definition, Directive, Document, Field, FragmentDefinition, Selection, SelectionSet,
    TypeCondition, Value as AstValue, VariableDefinition,
};
use graphql_parser::Pos;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry;
use std::collections::VecDeque;
use tql_core::{format_error, GraphError, Map};
use tql_schema::coercion::{coerce_input_value, contains_variable, value_from_ast};
use tql_schema::scalar::is_built_in;
use tql_schema::{FieldDef, Schema, TypeDef, TypeRef};

/// Directives every schema understands.
const KNOWN_DIRECTIVES: [&str; 2] = ["skip", "include"];

/// A definition that owns variable usages and fragment spreads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Scope<'v> {
    /// An operation, by definition index.
    Operation(usize),
    Fragment(&'v str),
}

#[derive(Debug, Clone)]
struct VariableUsage<'v> {
    name: &'v str,
    /// Position of the field or directive the variable is passed to.
    position: Pos,
    expected: Option<TypeRef>,
    has_location_default: bool,
}

#[derive(Debug, Default)]
struct ScopeInfo<'v> {
    usages: Vec<VariableUsage<'v>>,
    spreads: Vec<(&'v str, Pos)>,
}

/// Result of validation.
#[derive(Debug)]
pub struct ValidationResult {
    pub diagnostics: DiagnosticBag,
}

impl ValidationResult {
    /// Returns true if validation succeeded.
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Returns the errors in the order they were found.
    pub fn into_errors(self) -> Vec<GraphError> {
        self.diagnostics.into_errors()
    }
}

/// Validator for query documents.
pub struct Validator<'v, 'a> {
    schema: &'v Schema,
    document: &'v Document<'a, String>,
    fragments: FxHashMap<&'v str, &'v FragmentDefinition<'a, String>>,
    scopes: FxHashMap<Scope<'v>, ScopeInfo<'v>>,
    diagnostics: DiagnosticBag,
}

impl<'v, 'a> Validator<'v, 'a> {
    /// Creates a new validator.
    pub fn new(schema: &'v Schema, document: &'v Document<'a, String>) -> Self {
        let mut fragments = FxHashMap::default();
        for definition in &document.definitions {
            if let Definition::Fragment(fragment) = definition {
                fragments.entry(fragment.name.as_str()).or_insert(fragment);
            }
        }

        Self {
            schema,
            document,
            fragments,
            scopes: FxHashMap::default(),
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Validates the document, then the variables of the selected operation.
    pub fn validate(mut self, operation_name: Option<&str>, variables: &Map) -> ValidationResult {
        self.check_definitions();
        self.check_operation_variables();
        self.check_fragment_cycles();
        self.check_unused_fragments();

        // Provided values are only coerced against a valid document.
        let structurally_valid = !self.diagnostics.has_errors();
        match select_operation(self.document, operation_name) {
            Ok(operation) => {
                let definitions = operation.variable_definitions;
                if structurally_valid {
                    if let Err(errors) = coerce_variable_values(self.schema, definitions, variables)
                    {
                        self.diagnostics.extend(errors);
                    }
                } else {
                    self.diagnostics
                        .extend(check_required_variables(self.schema, definitions, variables));
                }
            }
            Err(failure) => self.diagnostics.add(format_error(failure, [], None)),
        }

        ValidationResult {
            diagnostics: self.diagnostics,
        }
    }

    fn scope(&mut self, scope: Scope<'v>) -> &mut ScopeInfo<'v> {
        self.scopes.entry(scope).or_default()
    }

    // First pass

    fn check_definitions(&mut self) {
        let document = self.document;
        let operation_count = document
            .definitions
            .iter()
            .filter(|d| matches!(d, Definition::Operation(_)))
            .count();
        let mut operation_names: FxHashMap<&'v str, Pos> = FxHashMap::default();
        let mut fragment_names: FxHashMap<&'v str, Pos> = FxHashMap::default();

        for (index, definition) in document.definitions.iter().enumerate() {
            match definition {
                Definition::Operation(definition) => {
                    let operation = Operation::from(definition);
                    match operation.name {
                        Some(name) => match operation_names.entry(name) {
                            Entry::Occupied(first) => self.diagnostics.error(
                                format!("There can be only one operation named \"{name}\"."),
                                [*first.get(), operation.position],
                            ),
                            Entry::Vacant(slot) => {
                                slot.insert(operation.position);
                            }
                        },
                        None if operation_count > 1 => self.diagnostics.error(
                            "This anonymous operation must be the only defined operation.",
                            [operation.position],
                        ),
                        None => {}
                    }

                    let scope = Scope::Operation(index);
                    self.check_variable_definitions(operation.variable_definitions);
                    self.check_directives(scope, operation.directives);
                    let root = self.root_type(&operation);
                    self.visit_selection_set(scope, root, operation.selection_set);
                }
                Definition::Fragment(fragment) => {
                    let name = fragment.name.as_str();
                    match fragment_names.entry(name) {
                        Entry::Occupied(first) => self.diagnostics.error(
                            format!("There can be only one fragment named \"{name}\"."),
                            [*first.get(), fragment.position],
                        ),
                        Entry::Vacant(slot) => {
                            slot.insert(fragment.position);
                        }
                    }

                    let scope = Scope::Fragment(name);
                    self.check_directives(scope, &fragment.directives);
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    let target = match self.schema.get_type(condition) {
                        None => {
                            let message = format!("Unknown type \"{condition}\".");
                            self.diagnostics.error(message, [fragment.position]);
                            None
                        }
                        Some(def) if !def.is_composite() => {
                            self.diagnostics.error(
                                format!(
                                    "Fragment \"{name}\" cannot condition on non composite type \"{condition}\"."
                                ),
                                [fragment.position],
                            );
                            None
                        }
                        Some(_) => Some(condition.as_str()),
                    };
                    self.visit_selection_set(scope, target, &fragment.selection_set);
                }
            }
        }
    }

    fn root_type(&mut self, operation: &Operation<'v, 'a>) -> Option<&'v str> {
        let schema = self.schema;
        match operation.kind {
            OperationKind::Query => Some(schema.query_type()),
            OperationKind::Mutation if schema.mutation_type().is_some() => schema.mutation_type(),
            kind => {
                self.diagnostics.error(
                    format!("Schema is not configured to execute {kind} operation."),
                    [operation.position],
                );
                None
            }
        }
    }

    fn check_variable_definitions(&mut self, definitions: &'v [VariableDefinition<'a, String>]) {
        let mut seen: FxHashMap<&str, Pos> = FxHashMap::default();
        for definition in definitions {
            let name = definition.name.as_str();
            if let Some(first) = seen.insert(name, definition.position) {
                self.diagnostics.error(
                    format!("There can be only one variable named \"${name}\"."),
                    [first, definition.position],
                );
            }

            let ty = TypeRef::from(&definition.var_type);
            match self.schema.get_type(ty.named_type()) {
                None => self.diagnostics.error(
                    format!("Unknown type \"{}\".", ty.named_type()),
                    [definition.position],
                ),
                Some(def) if !def.is_leaf() => self.diagnostics.error(
                    format!("Variable \"${name}\" cannot be non-input type \"{ty}\"."),
                    [definition.position],
                ),
                Some(_) => {}
            }
        }
    }

    fn visit_selection_set(
        &mut self,
        scope: Scope<'v>,
        parent: Option<&'v str>,
        selection_set: &'v SelectionSet<'a, String>,
    ) {
        let schema = self.schema;
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => self.visit_field(scope, parent, field),
                Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    self.check_directives(scope, &spread.directives);
                    self.scope(scope).spreads.push((name, spread.position));

                    let Some(fragment) = self.fragments.get(name).copied() else {
                        self.diagnostics
                            .error(format!("Unknown fragment \"{name}\"."), [spread.position]);
                        continue;
                    };
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    if let Some(parent) = parent {
                        if schema.is_composite_type(condition)
                            && !schema.do_types_overlap(parent, condition)
                        {
                            self.diagnostics.error(
                                format!(
                                    "Fragment \"{name}\" cannot be spread here as objects of type \"{parent}\" can never be of type \"{condition}\"."
                                ),
                                [spread.position],
                            );
                        }
                    }
                }
                Selection::InlineFragment(inline) => {
                    self.check_directives(scope, &inline.directives);
                    let target = match &inline.type_condition {
                        None => parent,
                        Some(TypeCondition::On(condition)) => match schema.get_type(condition) {
                            None => {
                                self.diagnostics.error(
                                    format!("Unknown type \"{condition}\"."),
                                    [inline.position],
                                );
                                None
                            }
                            Some(def) if !def.is_composite() => {
                                self.diagnostics.error(
                                    format!(
                                        "Fragment cannot condition on non composite type \"{condition}\"."
                                    ),
                                    [inline.position],
                                );
                                None
                            }
                            Some(_) => {
                                if let Some(parent) = parent {
                                    if !schema.do_types_overlap(parent, condition) {
                                        self.diagnostics.error(
                                            format!(
                                                "Fragment cannot be spread here as objects of type \"{parent}\" can never be of type \"{condition}\"."
                                            ),
                                            [inline.position],
                                        );
                                    }
                                }
                                Some(condition.as_str())
                            }
                        },
                    };
                    self.visit_selection_set(scope, target, &inline.selection_set);
                }
            }
        }
    }

    fn visit_field(
        &mut self,
        scope: Scope<'v>,
        parent: Option<&'v str>,
        field: &'v Field<'a, String>,
    ) {
        let schema = self.schema;
        self.check_directives(scope, &field.directives);

        let Some(parent) = parent else {
            self.visit_arguments(scope, field, None);
            self.visit_selection_set(scope, None, &field.selection_set);
            return;
        };

        if field.name == "__typename" {
            self.visit_arguments(scope, field, None);
            if !field.selection_set.items.is_empty() {
                self.diagnostics.error(
                    "Field \"__typename\" must not have a selection since type \"String!\" has no subfields.",
                    [field.position],
                );
            }
            return;
        }

        let Some(def) = schema.field(parent, &field.name) else {
            self.diagnostics.error(
                format!("Cannot query field \"{}\" on type \"{parent}\".", field.name),
                [field.position],
            );
            self.visit_arguments(scope, field, None);
            self.visit_selection_set(scope, None, &field.selection_set);
            return;
        };

        self.visit_arguments(scope, field, Some((parent, def)));

        let named = def.ty.named_type();
        let has_selection = !field.selection_set.items.is_empty();
        if schema.is_leaf_type(named) {
            if has_selection {
                self.diagnostics.error(
                    format!(
                        "Field \"{}\" must not have a selection since type \"{}\" has no subfields.",
                        field.name, def.ty
                    ),
                    [field.position],
                );
            }
            self.visit_selection_set(scope, None, &field.selection_set);
        } else {
            if !has_selection {
                self.diagnostics.error(
                    format!(
                        "Field \"{name}\" of type \"{}\" must have a selection of subfields. Did you mean \"{name} {{ ... }}\"?",
                        def.ty,
                        name = field.name
                    ),
                    [field.position],
                );
            }
            self.visit_selection_set(scope, Some(named), &field.selection_set);
        }
    }

    fn visit_arguments(
        &mut self,
        scope: Scope<'v>,
        field: &'v Field<'a, String>,
        def: Option<(&str, &'v FieldDef)>,
    ) {
        let Some((parent, def)) = def else {
            for (_, value) in &field.arguments {
                self.record_usages(scope, field.position, value);
            }
            return;
        };

        for (name, value) in &field.arguments {
            match def.arguments.get(name) {
                None => {
                    let message = format!(
                        "Unknown argument \"{name}\" on field \"{parent}.{}\".",
                        field.name
                    );
                    self.diagnostics.error(message, [field.position]);
                    self.record_usages(scope, field.position, value);
                }
                Some(argument) => {
                    let has_default = argument.default_value.is_some();
                    if !self.visit_value(scope, field.position, &argument.ty, has_default, value) {
                        self.diagnostics.error(
                            format!("Argument \"{name}\" has invalid value {value}."),
                            [field.position],
                        );
                    }
                }
            }
        }

        for argument in def.arguments.values() {
            let provided = field.arguments.iter().any(|(name, _)| *name == argument.name);
            if argument.is_required() && !provided {
                self.diagnostics.error(
                    format!(
                        "Field \"{}\" argument \"{}\" of type \"{}\" is required, but it was not provided.",
                        field.name, argument.name, argument.ty
                    ),
                    [field.position],
                );
            }
        }
    }

    fn check_directives(&mut self, scope: Scope<'v>, directives: &'v [Directive<'a, String>]) {
        let condition = TypeRef::named_non_null("Boolean");
        for directive in directives {
            let name = directive.name.as_str();
            if !KNOWN_DIRECTIVES.contains(&name) {
                self.diagnostics
                    .error(format!("Unknown directive \"@{name}\"."), [directive.position]);
                for (_, value) in &directive.arguments {
                    self.record_usages(scope, directive.position, value);
                }
                continue;
            }

            let mut has_condition = false;
            for (argument, value) in &directive.arguments {
                if argument == "if" {
                    has_condition = true;
                    if !self.visit_value(scope, directive.position, &condition, false, value) {
                        self.diagnostics.error(
                            format!("Argument \"if\" has invalid value {value}."),
                            [directive.position],
                        );
                    }
                } else {
                    self.diagnostics.error(
                        format!("Unknown argument \"{argument}\" on directive \"@{name}\"."),
                        [directive.position],
                    );
                    self.record_usages(scope, directive.position, value);
                }
            }
            if !has_condition {
                self.diagnostics.error(
                    format!(
                        "Directive \"@{name}\" argument \"if\" of type \"Boolean!\" is required, but it was not provided."
                    ),
                    [directive.position],
                );
            }
        }
    }

    /// Records the variables inside a value passed where the expected type
    /// is `ty`, and returns whether the literal parts of the value are valid.
    fn visit_value(
        &mut self,
        scope: Scope<'v>,
        position: Pos,
        ty: &TypeRef,
        has_location_default: bool,
        value: &'v AstValue<'a, String>,
    ) -> bool {
        match value {
            AstValue::Variable(name) => {
                self.scope(scope).usages.push(VariableUsage {
                    name: name.as_str(),
                    position,
                    expected: Some(ty.clone()),
                    has_location_default,
                });
                true
            }
            _ if !contains_variable(value) => self.is_valid_literal(ty, value),
            AstValue::List(items) => {
                if let TypeRef::List(item_type) = ty.unwrap_non_null() {
                    let mut valid = true;
                    for item in items {
                        valid &= self.visit_value(scope, position, item_type, false, item);
                    }
                    valid
                } else {
                    self.record_usages(scope, position, value);
                    false
                }
            }
            _ => {
                self.record_usages(scope, position, value);
                false
            }
        }
    }

    /// Records variables whose expected type is unknown.
    fn record_usages(&mut self, scope: Scope<'v>, position: Pos, value: &'v AstValue<'a, String>) {
        match value {
            AstValue::Variable(name) => self.scope(scope).usages.push(VariableUsage {
                name: name.as_str(),
                position,
                expected: None,
                has_location_default: false,
            }),
            AstValue::List(items) => {
                for item in items {
                    self.record_usages(scope, position, item);
                }
            }
            AstValue::Object(fields) => {
                for item in fields.values() {
                    self.record_usages(scope, position, item);
                }
            }
            _ => {}
        }
    }

    fn is_valid_literal(&self, ty: &TypeRef, value: &AstValue<'a, String>) -> bool {
        match (ty, value) {
            (TypeRef::NonNull(_), AstValue::Null) => false,
            (TypeRef::NonNull(inner), _) => self.is_valid_literal(inner, value),
            (_, AstValue::Null) => true,
            (TypeRef::List(inner), AstValue::List(items)) => {
                items.iter().all(|item| self.is_valid_literal(inner, item))
            }
            (TypeRef::List(inner), _) => self.is_valid_literal(inner, value),
            (TypeRef::Named(name), _) => match self.schema.get_type(name) {
                Some(TypeDef::Enum(def)) => {
                    matches!(value, AstValue::Enum(v) if def.has_value(v))
                }
                Some(TypeDef::Scalar(scalar)) => {
                    if matches!(value, AstValue::Enum(_)) && is_built_in(&scalar.name) {
                        return false;
                    }
                    coerce_input_value(self.schema, ty, &value_from_ast(value, &Map::new())).is_ok()
                }
                _ => false,
            },
        }
    }

    // Second pass

    /// Returns the fragments reachable from a scope, in breadth-first order.
    fn reachable_fragments(&self, scope: Scope<'v>) -> Vec<&'v str> {
        let mut reached = Vec::new();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([scope]);

        while let Some(scope) = queue.pop_front() {
            let Some(info) = self.scopes.get(&scope) else {
                continue;
            };
            for (name, _) in &info.spreads {
                if self.fragments.contains_key(name) && visited.insert(*name) {
                    reached.push(*name);
                    queue.push_back(Scope::Fragment(*name));
                }
            }
        }
        reached
    }

    fn check_operation_variables(&mut self) {
        let document = self.document;
        for (index, definition) in document.definitions.iter().enumerate() {
            let Definition::Operation(definition) = definition else {
                continue;
            };
            let operation = Operation::from(definition);
            let scope = Scope::Operation(index);

            let mut usages: Vec<VariableUsage<'v>> = Vec::new();
            let scopes = std::iter::once(scope)
                .chain(self.reachable_fragments(scope).into_iter().map(Scope::Fragment));
            for scope in scopes {
                if let Some(info) = self.scopes.get(&scope) {
                    usages.extend(info.usages.iter().cloned());
                }
            }

            for usage in &usages {
                let definition = operation
                    .variable_definitions
                    .iter()
                    .find(|d| d.name == usage.name);
                match definition {
                    None => {
                        let message = match operation.name {
                            Some(op) => format!(
                                "Variable \"${}\" is not defined by operation \"{op}\".",
                                usage.name
                            ),
                            None => format!("Variable \"${}\" is not defined.", usage.name),
                        };
                        self.diagnostics
                            .error(message, [usage.position, operation.position]);
                    }
                    Some(definition) => {
                        let Some(expected) = &usage.expected else {
                            continue;
                        };
                        let var_type = TypeRef::from(&definition.var_type);
                        if self.schema.get_type(var_type.named_type()).is_some()
                            && !self.is_allowed_usage(
                                definition,
                                &var_type,
                                expected,
                                usage.has_location_default,
                            )
                        {
                            self.diagnostics.error(
                                format!(
                                    "Variable \"${}\" of type \"{var_type}\" used in position expecting type \"{expected}\".",
                                    usage.name
                                ),
                                [definition.position, usage.position],
                            );
                        }
                    }
                }
            }

            for definition in operation.variable_definitions {
                if !usages.iter().any(|u| u.name == definition.name) {
                    let message = match operation.name {
                        Some(op) => format!(
                            "Variable \"${}\" is never used in operation \"{op}\".",
                            definition.name
                        ),
                        None => format!("Variable \"${}\" is never used.", definition.name),
                    };
                    self.diagnostics.error(message, [definition.position]);
                }
            }
        }
    }

    /// A nullable variable may flow into a non-null position when either the
    /// variable or the position has a default value.
    fn is_allowed_usage(
        &self,
        definition: &VariableDefinition<'a, String>,
        var_type: &TypeRef,
        expected: &TypeRef,
        has_location_default: bool,
    ) -> bool {
        if let TypeRef::NonNull(expected_inner) = expected {
            if !var_type.is_non_null() {
                let has_non_null_default = definition
                    .default_value
                    .as_ref()
                    .is_some_and(|v| !matches!(v, AstValue::Null));
                if !has_non_null_default && !has_location_default {
                    return false;
                }
                return self.schema.is_type_sub_type_of(var_type, expected_inner);
            }
        }
        self.schema.is_type_sub_type_of(var_type, expected)
    }

    fn check_fragment_cycles(&mut self) {
        let document = self.document;
        let mut visited = FxHashSet::default();
        let mut path = Vec::new();
        let mut path_index = FxHashMap::default();

        for definition in &document.definitions {
            if let Definition::Fragment(fragment) = definition {
                self.detect_cycle(fragment.name.as_str(), &mut visited, &mut path, &mut path_index);
            }
        }
    }

    fn detect_cycle(
        &mut self,
        fragment: &'v str,
        visited: &mut FxHashSet<&'v str>,
        path: &mut Vec<(&'v str, Pos)>,
        path_index: &mut FxHashMap<&'v str, usize>,
    ) {
        if !visited.insert(fragment) {
            return;
        }
        let spreads = match self.scopes.get(&Scope::Fragment(fragment)) {
            Some(info) if !info.spreads.is_empty() => info.spreads.clone(),
            _ => return,
        };

        path_index.insert(fragment, path.len());
        for spread in spreads {
            let (name, _) = spread;
            let cycle_start = path_index.get(name).copied();
            path.push(spread);
            match cycle_start {
                None => {
                    if self.fragments.contains_key(name) {
                        self.detect_cycle(name, visited, path, path_index);
                    }
                }
                Some(start) => {
                    let cycle = &path[start..];
                    let via: Vec<String> = cycle[..cycle.len() - 1]
                        .iter()
                        .map(|(name, _)| format!("\"{name}\""))
                        .collect();
                    let message = if via.is_empty() {
                        format!("Cannot spread fragment \"{name}\" within itself.")
                    } else {
                        format!(
                            "Cannot spread fragment \"{name}\" within itself via {}.",
                            via.join(", ")
                        )
                    };
                    let positions: Vec<Pos> = cycle.iter().map(|(_, pos)| *pos).collect();
                    self.diagnostics.error(message, positions);
                }
            }
            path.pop();
        }
        path_index.remove(fragment);
    }

    fn check_unused_fragments(&mut self) {
        let document = self.document;
        let mut used = FxHashSet::default();
        for (index, definition) in document.definitions.iter().enumerate() {
            if matches!(definition, Definition::Operation(_)) {
                used.extend(self.reachable_fragments(Scope::Operation(index)));
            }
        }

        for definition in &document.definitions {
            if let Definition::Fragment(fragment) = definition {
                if !used.contains(fragment.name.as_str()) {
                    self.diagnostics.error(
                        format!("Fragment \"{}\" is never used.", fragment.name),
                        [fragment.position],
                    );
                }
            }
        }
    }
}
