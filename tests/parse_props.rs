use proptest::prelude::*;

use shellax::parse;

fn word() -> impl Strategy<Value = String> {
	"[a-z0-9_.-]{1,8}"
}

proptest! {
	#[test]
	fn argument_count_matches_tokens(name in word(), args in prop::collection::vec(word(), 0..8)) {
		let mut line = name.clone();
		for arg in &args {
			line.push_str("  ");
			line.push_str(arg);
		}
		let command = parse(&line);
		prop_assert_eq!(&command.name, &name);
		prop_assert_eq!(&command.arguments, &args);
		let argv: Vec<&str> = command.argv().collect();
		prop_assert_eq!(argv.len(), args.len() + 1);
		prop_assert_eq!(argv[0], name.as_str());
	}

	#[test]
	fn pipes_keep_stage_order(stages in prop::collection::vec((word(), word()), 1..6)) {
		let line = stages.iter()
			.map(|(name, arg)| format!("{} {}", name, arg))
			.collect::<Vec<_>>()
			.join(" | ");
		let chain = parse(&line);
		prop_assert_eq!(chain.len(), stages.len());
		for (stage, (name, arg)) in chain.stages().zip(&stages) {
			prop_assert_eq!(&stage.name, name);
			prop_assert_eq!(&stage.arguments, &vec![arg.clone()]);
		}
	}

	#[test]
	fn parse_never_panics(line in ".{0,64}") {
		let chain = parse(&line);
		prop_assert!(chain.len() >= 1);
	}
}
