#[cfg(test)]
mod tests {
    use crate::*;
    use std::sync::Arc;

    fn sample() -> DeclarationBuilder {
        DeclarationBuilder::new("Sample", "three declarations")
            .append_step(Step::declare("a", 1.0))
            .and_then(|b| b.append_step(Step::declare("b", "two")))
            .and_then(|b| b.append_step(Step::declare("c", true)))
            .unwrap()
    }

    fn names(builder: &DeclarationBuilder) -> Vec<String> {
        builder
            .declaration()
            .declared_names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_replace_leaves_original_untouched() {
        let original = sample();
        let before = original.declaration().to_json_pretty().unwrap();

        let edited = original.replace_step_at(1, Step::declare("x", 9.0)).unwrap();

        assert_eq!(*edited.steps()[1], Step::declare("x", 9.0));
        assert!(Arc::ptr_eq(&edited.steps()[0], &original.steps()[0]));
        assert!(Arc::ptr_eq(&edited.steps()[2], &original.steps()[2]));
        assert_eq!(original.declaration().to_json_pretty().unwrap(), before);
        assert_eq!(names(&original), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_append_is_index_stable() {
        let original = sample();
        let appended = original.append_step(Step::declare("d", 4.0)).unwrap();

        assert_eq!(appended.steps().len(), 4);
        for (index, step) in original.steps().iter().enumerate() {
            assert_eq!(&appended.steps()[index], step);
        }
    }

    #[test]
    fn test_remove_shifts_later_steps() {
        let original = sample();
        let removed = original.remove_step_at(0).unwrap();

        assert_eq!(removed.steps().len(), original.steps().len() - 1);
        for j in 0..removed.steps().len() {
            assert_eq!(removed.steps()[j], original.steps()[j + 1]);
        }
        assert_eq!(names(&removed), vec!["b", "c"]);
    }

    #[test]
    fn test_out_of_range_is_rejected_without_change() {
        let original = sample();
        let before = serde_json::to_vec(&**original.declaration()).unwrap();

        let replace = original.replace_step_at(3, Step::declare("z", 0.0));
        assert_eq!(
            replace.unwrap_err(),
            BuilderError::IndexOutOfRange { index: 3, len: 3 }
        );
        assert!(matches!(
            original.remove_step_at(10),
            Err(BuilderError::IndexOutOfRange { index: 10, len: 3 })
        ));

        let after = serde_json::to_vec(&**original.declaration()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_edit_of_wrong_kind_is_rejected() {
        let builder = sample()
            .append_step(FunctionCall::new("_functions.Math.Add"))
            .unwrap();

        let result = builder.edit_declaration_at(3, |d| d.with_name("renamed"));
        assert_eq!(
            result.unwrap_err(),
            BuilderError::StepTypeMismatch {
                index: 3,
                expected: StepKind::DeclareVariable,
                found: StepKind::CallFunction,
            }
        );

        let retyped = builder
            .edit_declaration_at(1, |d| d.with_type(DataType::Number))
            .unwrap();
        assert_eq!(
            retyped.steps()[1].as_declaration().map(|d| d.value.clone()),
            Some(TypedValue::Number(0.0))
        );
    }

    #[test]
    fn test_declared_names_must_be_valid() {
        let builder = sample();
        assert_eq!(
            builder.append_step(Step::declare("a", 2.0)).unwrap_err(),
            BuilderError::DuplicateVariable("a".into())
        );
        assert_eq!(
            builder
                .append_step(Step::template(StepKind::DeclareVariable))
                .unwrap_err(),
            BuilderError::EmptyVariableName
        );
        // replacing a declaration with one of the same name is not a duplicate
        assert!(builder.replace_step_at(0, Step::declare("a", 5.0)).is_ok());
    }

    #[test]
    fn test_nested_edits_copy_only_the_touched_path() {
        let builder = sample()
            .append_step(Step::template(StepKind::WhileLoop))
            .unwrap();
        let body = BlockPath::root().child(3, Block::Body);

        let with_body = builder
            .append_step_in(&body, Step::template(StepKind::Branch))
            .unwrap();
        let then_block = body.clone().child(0, Block::Then);
        let nested = with_body
            .append_step_in(&then_block, Step::declare("inner", false))
            .unwrap();

        assert!(Arc::ptr_eq(&nested.steps()[0], &builder.steps()[0]));
        let branch = &nested.steps()[3].block(Block::Body).unwrap()[0];
        assert_eq!(branch.block(Block::Then).unwrap().len(), 1);
        assert_eq!(with_body.steps()[3].block(Block::Body).unwrap().len(), 1);
        assert_eq!(
            with_body.steps()[3].block(Block::Body).unwrap()[0]
                .block(Block::Then)
                .unwrap()
                .len(),
            0
        );

        let removed = nested.remove_step_at_in(&then_block, 0).unwrap();
        assert_eq!(removed, with_body);

        let wrong = BlockPath::root().child(0, Block::Body);
        assert_eq!(
            nested.append_step_in(&wrong, Step::declare("y", 1.0)).unwrap_err(),
            BuilderError::BlockNotFound {
                index: 0,
                kind: StepKind::DeclareVariable,
                block: Block::Body,
            }
        );
    }

    #[test]
    fn test_duplicate_detected_across_nesting() {
        let builder = sample()
            .append_step(Step::template(StepKind::ForEachLoop))
            .unwrap();
        let body = BlockPath::root().child(3, Block::Body);
        assert_eq!(
            builder.append_step_in(&body, Step::declare("b", 1.0)).unwrap_err(),
            BuilderError::DuplicateVariable("b".into())
        );
    }

    #[test]
    fn test_set_field_changes_one_field() {
        let builder = sample();
        let renamed = builder
            .set_field(DeclarationField::Define, "Renamed")
            .set_field(DeclarationField::ReturnIdentifier, "c");

        assert_eq!(renamed.declaration().define(), "Renamed");
        assert_eq!(renamed.declaration().description(), "three declarations");
        assert_eq!(
            renamed.declaration().return_identifier(),
            Some(&VariableRef::variable("c"))
        );
        assert_eq!(renamed.steps(), builder.steps());
        assert_eq!(builder.declaration().define(), "Sample");
    }

    #[test]
    fn test_counter_built_by_edits_matches_wire_form() {
        let index = VariableRef::variable("index");
        let builder = DeclarationBuilder::new("Counter", "Counts to ten")
            .append_step(Step::declare("index", 0.0))
            .and_then(|b| {
                b.append_step(WhileLoop {
                    condition: Expression::call(
                        FunctionCall::new("_functions.Math.LessThan")
                            .argument("a", index.clone())
                            .argument("b", Operand::literal(10)),
                    ),
                    body: Vec::new(),
                })
            })
            .and_then(|b| {
                b.append_step_in(
                    &BlockPath::root().child(1, Block::Body),
                    FunctionCall::new("_functions.Math.Add")
                        .argument(
                            "numbers",
                            Operand::literal(serde_json::json!(["$$variables.index", 1])),
                        )
                        .set(index.clone()),
                )
            })
            .unwrap()
            .set_field(DeclarationField::ReturnIdentifier, "index");

        let parsed = FlowgraphDeclaration::from_json_str(
            &builder.declaration().to_json_pretty().unwrap(),
        )
        .unwrap();
        assert_eq!(&parsed, &**builder.declaration());
        assert!(parsed.diagnostics().is_empty());
    }

    #[test]
    fn test_non_finite_literals_are_rejected() {
        let builder = sample();
        assert!(matches!(
            builder.append_step(Step::declare("x", f64::NAN)),
            Err(BuilderError::Value(ValueError::InvalidLiteral {
                data_type: DataType::Number,
                ..
            }))
        ));
        assert!(builder
            .edit_declaration_at(0, |d| d.with_value(f64::INFINITY))
            .is_err());

        let with_loop = builder.append_step(Step::template(StepKind::WhileLoop)).unwrap();
        assert!(with_loop
            .append_step_in(
                &BlockPath::root().child(3, Block::Body),
                Step::declare("y", f64::NEG_INFINITY),
            )
            .is_err());

        let json = builder.declaration().to_json_pretty().unwrap();
        assert!(!json.contains("null"));
        assert!(FlowgraphDeclaration::from_json_str(&json).is_ok());
    }

    #[test]
    fn test_declaration_template_needs_a_name_before_append() {
        let template = Step::template(StepKind::DeclareVariable);
        let named = match &template {
            Step::DeclareVariable(declaration) => {
                Step::DeclareVariable(declaration.with_name("d"))
            }
            other => other.clone(),
        };
        let builder = sample().append_step(named).unwrap();
        assert_eq!(names(&builder), vec!["a", "b", "c", "d"]);
        assert_eq!(
            builder.declaration().steps()[3].as_declaration().map(|d| d.data_type()),
            Some(DataType::String)
        );
    }
}
