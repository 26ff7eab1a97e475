use smartchef_core::{
    classify, consolidate, parse_ingredient, Category, EngineConfig, Interaction, InteractionRanker, Recipe,
    SearchEngine, SearchFilters,
};
use time::macros::datetime;

fn corpus() -> Vec<Recipe> {
    serde_json::from_str(
        r#"[
        {"id": "r1", "name": "Spaghetti Carbonara", "cuisine": "Italian", "difficulty": "medium", "servings": 4,
         "ingredients": ["400 g spaghetti", "200 g pancetta", "4 eggs", "100 g parmesan"], "dietary_tags": []},
        {"id": "r2", "name": "Vegetable Stir Fry", "cuisine": "Chinese", "difficulty": "easy", "servings": 2,
         "ingredients": ["1 broccoli", "2 carrots", "2 tbsp soy sauce", "1 tbsp ginger"], "dietary_tags": ["vegan", "vegetarian"]},
        {"id": "r3", "name": "Caprese Salad", "cuisine": "Italian", "difficulty": "easy", "servings": 2,
         "ingredients": ["3 tomatoes", "200 g mozzarella", "basil"], "dietary_tags": ["vegetarian", "gluten-free"]},
        {"id": "r4", "name": "Beef Tacos", "cuisine": "Mexican", "difficulty": "easy", "servings": 4,
         "ingredients": ["500 g beef", "8 tortillas", "1 onion"], "dietary_tags": []},
        {"id": "r5", "name": "Mushroom Risotto", "cuisine": "Italian", "difficulty": "hard", "servings": 4,
         "ingredients": ["300 g arborio rice", "250 g mushrooms", "1 l stock", "50 g parmesan"], "dietary_tags": ["vegetarian"]}
    ]"#,
    )
    .unwrap()
}

fn engine() -> SearchEngine {
    SearchEngine::with_corpus(EngineConfig::default(), &corpus())
}

#[test]
fn parsing_examples() {
    let p = parse_ingredient("2 cups flour");
    assert_eq!((p.quantity, p.unit.as_str(), p.name.as_str()), (2.0, "cup", "flour"));
    let p = parse_ingredient("flour");
    assert_eq!((p.quantity, p.unit.as_str(), p.name.as_str()), (1.0, "", "flour"));
    let p = parse_ingredient("abc flour");
    assert_eq!((p.quantity, p.unit.as_str(), p.name.as_str()), (1.0, "", "abc flour"));
}

#[test]
fn classification_examples() {
    assert_eq!(classify("cheddar cheese"), Category::Dairy);
    assert_eq!(classify("xyz"), Category::Other);
}

#[test]
fn matching_recipe_ranks_above_unrelated_one() {
    let corpus = corpus();
    let engine = engine();
    let query = format!("{} with extra", corpus[2].document_text());
    let ranked = engine.snapshot().query(&query);

    let pos = |id: &str| ranked.iter().position(|(rid, _)| rid == id).unwrap();
    assert!(pos("r3") < pos("r4"));
    let score = |id: &str| ranked[pos(id)].1;
    assert!(score("r3") > 0.5);
    assert_eq!(score("r4"), 0.0);
    assert!(ranked.iter().all(|(_, s)| (0.0..=1.0).contains(s)));
}

#[test]
fn ties_keep_corpus_order() {
    let ranked = engine().snapshot().query("nothing matches this");
    let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3", "r4", "r5"]);
}

#[test]
fn cuisine_filter_and_limit() {
    let engine = engine();
    let filters = SearchFilters::cuisine("Italian");
    for limit in 1..=6 {
        let results = engine.search("parmesan tomatoes beef", limit, Some(&filters)).unwrap();
        assert!(results.len() <= limit);
        assert!(results.iter().all(|r| r.recipe.cuisine == "Italian"));
    }
    assert_eq!(engine.search("parmesan", 10, Some(&filters)).unwrap().len(), 3);
}

#[test]
fn ingredient_search_finds_the_stir_fry() {
    let results = engine().search_by_ingredients(&["broccoli", "carrots", "ginger"], 3).unwrap();
    assert_eq!(results[0].recipe.id, "r2");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn recommend_without_history_is_the_popular_search() {
    let engine = engine();
    let recs = InteractionRanker::new(&engine).recommend("u1", &[], 3).unwrap();
    let popular: Vec<Recipe> = engine.search("popular", 3, None).unwrap().into_iter().map(|s| s.recipe).collect();
    assert_eq!(recs, popular);
}

#[test]
fn recommend_expands_from_liked_recipes() {
    let engine = engine();
    let history = vec![Interaction {
        user_id: "u1".into(),
        recipe_id: "r1".into(),
        rating: 5,
        timestamp: datetime!(2024-03-01 18:30 UTC),
    }];
    let recs = InteractionRanker::new(&engine).recommend("u1", &history, 2).unwrap();
    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| r.id != "r1"));
    // the other Italian dishes share the "italian" term with the seed query
    assert!(recs.iter().all(|r| r.cuisine == "Italian"));
}

#[test]
fn consolidating_a_recipe_twice_doubles_it() {
    let corpus = corpus();
    let once = consolidate(&[(&corpus[0], 1.0)]).unwrap();
    let twice = consolidate(&[(&corpus[0], 1.0), (&corpus[0], 1.0)]).unwrap();
    assert_eq!(once.items.len(), twice.items.len());
    for (a, b) in once.items.iter().zip(&twice.items) {
        assert_eq!(b.quantity, a.quantity * 2.0);
        assert_eq!(b.source_recipe_ids, vec!["r1".to_string()]);
    }
}

#[test]
fn shopping_list_across_recipes() {
    let corpus = corpus();
    let list = consolidate(&[(&corpus[0], 0.5), (&corpus[4], 2.0)]).unwrap();
    let parmesan = list.items.iter().find(|i| i.name == "parmesan").unwrap();
    assert_eq!(parmesan.quantity, 150.0);
    assert_eq!(parmesan.unit, "g");
    assert_eq!(parmesan.category, Category::Dairy);
    assert_eq!(parmesan.source_recipe_ids, vec!["r1".to_string(), "r5".to_string()]);

    let categories: Vec<Category> = list.items.iter().map(|i| i.category).collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);
}
